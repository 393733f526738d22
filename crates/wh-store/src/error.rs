use wh_types::TypeError;

/// Errors from state storage and persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from a persistence backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding a backend was poisoned.
    #[error("lock poisoned: {0}")]
    Lock(String),

    /// A malformed path or id.
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
