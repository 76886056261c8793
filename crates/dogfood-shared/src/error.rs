use thiserror::Error;

/// Errors surfaced by the Dogfood core.
///
/// Validation and authorization failures are reported to the caller and never
/// retried. A transient store failure is also surfaced rather than retried:
/// re-sending after a timed-out-but-successful write would duplicate the
/// message, and the external contract carries no idempotency key.
#[derive(Error, Debug)]
pub enum DogfoodError {
    /// Malformed or missing required fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller identity does not match the sender/receiver the operation
    /// requires.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// The store was unreachable or failed mid-operation. The write may or
    /// may not have landed; the caller decides whether to retry.
    #[error("Store error: {0}")]
    TransientStore(String),

    /// The change feed rejected a subscribe or closed unexpectedly.
    #[error("Feed error: {0}")]
    Feed(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DogfoodError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }
}
