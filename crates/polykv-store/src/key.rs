//! Composite key codec.
//!
//! A record lives under `<id>::<name>::<kind>`. The segments are never
//! escaped, so the only guard against ambiguous boundaries is the delimiter
//! count check in [`encode`]: a key must contain exactly two delimiters.
//!
//! Lookups are pattern scans over the whole key space:
//!
//! | lookup | pattern |
//! |---|---|
//! | by id   | `<id>::*::*`   |
//! | by name | `*::<name>::*` |
//! | by kind | `*::*::<kind>` |
//!
//! Literal segments are glob-escaped before they go into a pattern, so a name
//! such as `a*` only ever matches itself.

use polykv_types::DELIMITER;

use crate::error::{StoreError, StoreResult};

/// Build the composite key for a record.
///
/// Fails with [`StoreError::InvalidKeyEncoding`] if any segment contains the
/// delimiter.
pub fn encode(id: &str, name: &str, kind: &str) -> StoreResult<String> {
    let key = [id, name, kind].join(DELIMITER);
    if key.matches(DELIMITER).count() != 2 {
        return Err(StoreError::InvalidKeyEncoding { key });
    }
    Ok(key)
}

/// Kind tag of a key: everything after the last delimiter.
pub fn kind_of(key: &str) -> Option<&str> {
    key.rfind(DELIMITER).map(|i| &key[i + DELIMITER.len()..])
}

/// Id segment of a key: everything before the first delimiter.
pub fn id_of(key: &str) -> Option<&str> {
    key.find(DELIMITER).map(|i| &key[..i])
}

/// The three segments of a composite key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyParts<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub kind: &'a str,
}

impl<'a> KeyParts<'a> {
    pub fn segment(&self, field: ScanField) -> &'a str {
        match field {
            ScanField::Id => self.id,
            ScanField::Name => self.name,
            ScanField::Kind => self.kind,
        }
    }
}

/// Split a key into its segments.
///
/// The id is cut at the first delimiter and the kind at the last one, so a
/// name with a colon at either edge (`"a:"`, `":a"`) is recovered intact.
/// Returns `None` for keys with fewer than two delimiters.
pub fn decode(key: &str) -> Option<KeyParts<'_>> {
    let first = key.find(DELIMITER)?;
    let last = key.rfind(DELIMITER)?;
    if last < first + DELIMITER.len() {
        return None;
    }
    Some(KeyParts {
        id: &key[..first],
        name: &key[first + DELIMITER.len()..last],
        kind: &key[last + DELIMITER.len()..],
    })
}

/// Which key segment a scan addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanField {
    Id,
    Name,
    Kind,
}

impl ScanField {
    /// Glob pattern selecting every key whose `self` segment is `literal`.
    pub fn pattern(self, literal: &str) -> String {
        let literal = glob::Pattern::escape(literal);
        match self {
            Self::Id => format!("{literal}::*::*"),
            Self::Name => format!("*::{literal}::*"),
            Self::Kind => format!("*::*::{literal}"),
        }
    }
}

impl std::fmt::Display for ScanField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id => write!(f, "id"),
            Self::Name => write!(f, "name"),
            Self::Kind => write!(f, "kind"),
        }
    }
}
