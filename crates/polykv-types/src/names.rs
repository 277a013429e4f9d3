//! Record name validation.
//!
//! Composite keys are built by joining segments with [`DELIMITER`] and are
//! never escaped, so a name may contain anything except the delimiter itself.
//! A single `:` is fine. The empty name passes here; the store rejects it at
//! persistence time because the name lookup path cannot address it.

use crate::error::TypeError;

/// Reserved separator between composite key segments.
pub const DELIMITER: &str = "::";

/// Returns `true` if `value` contains the reserved delimiter.
pub fn contains_delimiter(value: &str) -> bool {
    value.contains(DELIMITER)
}

/// Validate a record name, returning `Ok(())` if it can be persisted.
///
/// # Examples
///
/// ```
/// use polykv_types::names::validate_name;
///
/// assert!(validate_name("alice").is_ok());
/// assert!(validate_name("ab:c:").is_ok());
/// assert!(validate_name("ab::c").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<(), TypeError> {
    if contains_delimiter(name) {
        return Err(TypeError::ReservedDelimiter {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_plain_names() {
        assert!(validate_name("alice").is_ok());
        assert!(validate_name("fluffy the cat").is_ok());
        assert!(validate_name("").is_ok());
    }

    #[test]
    fn accepts_single_colons() {
        assert!(validate_name("a:b").is_ok());
        assert!(validate_name("ab:c:").is_ok());
        assert!(validate_name(":x").is_ok());
    }

    #[test]
    fn rejects_delimiter() {
        assert!(validate_name("a::b").is_err());
        assert!(validate_name("::").is_err());
        assert!(validate_name("trailing::").is_err());
        assert_eq!(
            validate_name("x:::y").unwrap_err(),
            TypeError::ReservedDelimiter {
                name: "x:::y".into()
            }
        );
    }

    proptest! {
        #[test]
        fn names_without_double_colon_pass(name in "([^:]|:[^:])*:?") {
            prop_assert!(validate_name(&name).is_ok());
        }

        #[test]
        fn any_embedded_delimiter_is_rejected(prefix in ".*", suffix in ".*") {
            let name = format!("{prefix}{DELIMITER}{suffix}");
            prop_assert_eq!(
                validate_name(&name),
                Err(TypeError::ReservedDelimiter { name: name.clone() })
            );
        }
    }
}
