//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
///
/// Storage failures are fatal to the calling operation; nothing in the sync
/// layer retries them.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A persisted row could not be decoded (bad id or timestamp).
    #[error("invalid data: {0}")]
    InvalidData(String),
}
