/// Errors raised by a key-value backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached; the call may succeed if retried.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend state is unreadable or internally inconsistent.
    #[error("corrupt backend state: {0}")]
    Corrupt(String),

    /// The scan pattern could not be compiled.
    #[error("invalid scan pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },
}

impl BackendError {
    /// Whether the failure is transient and worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result alias for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Caller-supplied arguments violate a precondition.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The would-be key does not contain exactly two delimiters.
    #[error("invalid key encoding: {key:?}")]
    InvalidKeyEncoding { key: String },

    /// No record is stored under the requested id.
    #[error("object not found: {0}")]
    NotFound(String),

    /// More than one key matched a supposedly unique id.
    #[error("multiple objects ({matches}) share id {id}")]
    AmbiguousId { id: String, matches: usize },

    /// The kind label has no registered decoder.
    #[error("unknown object kind: {0}")]
    UnknownObjectKind(String),

    /// Payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The operation context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation context's deadline passed.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
