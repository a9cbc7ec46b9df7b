//! Store error types.

use thiserror::Error;

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the SQLite mirror.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure, including rows that fail to decode.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A JSON column could not be encoded.
    #[error("failed to encode {field}: {source}")]
    Encode {
        field: &'static str,
        source: serde_json::Error,
    },

    /// The directory holding the database file could not be created.
    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },
}
