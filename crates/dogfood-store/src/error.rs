use thiserror::Error;

use dogfood_shared::DogfoodError;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Malformed input rejected before touching storage.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Sender/receiver identity does not match the link's participants.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// UUID parsing error.
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    /// Chrono parsing error.
    #[error("Timestamp parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),

    /// Media metadata (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for DogfoodError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(msg) => DogfoodError::Validation(msg),
            StoreError::Authorization(msg) => DogfoodError::Authorization(msg),
            other => DogfoodError::TransientStore(other.to_string()),
        }
    }
}
