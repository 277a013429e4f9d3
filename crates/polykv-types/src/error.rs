use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("name {name:?} contains the reserved delimiter \"::\"")]
    ReservedDelimiter { name: String },

    #[error("unknown kind: {0}")]
    UnknownKind(String),

    #[error("invalid record id {input:?}: {reason}")]
    InvalidId { input: String, reason: String },
}
