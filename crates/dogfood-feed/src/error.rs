use thiserror::Error;

use dogfood_shared::DogfoodError;

/// Errors produced by the change feed layer.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The feed is shutting down and cannot accept subscriptions.
    #[error("Feed closed")]
    Closed,

    /// Transport-level failure while subscribing or publishing.
    #[error("Feed transport error: {0}")]
    Transport(String),
}

impl From<FeedError> for DogfoodError {
    fn from(e: FeedError) -> Self {
        DogfoodError::Feed(e.to_string())
    }
}
