use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Stable tag identifying the concrete shape of a record.
///
/// The string form is part of every composite key (`id::name::kind`), so the
/// tags below are a durable contract: renaming a Rust type must never change
/// them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    Person,
    Animal,
}

impl Kind {
    /// Every known kind, in tag order.
    pub const ALL: [Kind; 2] = [Kind::Animal, Kind::Person];

    /// The persisted tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Animal => "Animal",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| TypeError::UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::contains_delimiter;

    #[test]
    fn tags_are_stable() {
        assert_eq!(Kind::Person.as_str(), "Person");
        assert_eq!(Kind::Animal.as_str(), "Animal");
        assert_eq!(format!("{}", Kind::Animal), "Animal");
    }

    #[test]
    fn parse_known_tags() {
        for kind in Kind::ALL {
            assert_eq!(kind.as_str().parse::<Kind>().unwrap(), kind);
        }
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert!("person".parse::<Kind>().is_err());
        assert_eq!(
            "Robot".parse::<Kind>().unwrap_err(),
            TypeError::UnknownKind("Robot".into())
        );
    }

    #[test]
    fn tags_are_delimiter_free() {
        for kind in Kind::ALL {
            assert!(!kind.as_str().is_empty());
            assert!(!contains_delimiter(kind.as_str()));
        }
    }
}
