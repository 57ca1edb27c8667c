use thiserror::Error;

/// The error surface of the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
