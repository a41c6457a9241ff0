//! Error types for the sync layer.

use jotter_types::NoteId;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network error (endpoint unreachable, request timed out). Transient:
    /// expected to clear once connectivity returns.
    #[error("network error: {0}")]
    Network(String),

    /// The remote answered and refused the operation, or returned a body
    /// that could not be decoded. Waiting will not fix it.
    #[error("remote rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Local durability failed. Fatal to the calling operation.
    #[error("storage error: {0}")]
    Storage(#[from] jotter_storage::StorageError),

    /// A sync attempt overran its deadline.
    #[error("sync attempt timed out")]
    Timeout,

    /// Operation referenced a note that does not exist locally.
    #[error("note not found: {0}")]
    NotFound(NoteId),

    /// A background task died before delivering its result.
    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl SyncError {
    /// True for failures expected to clear on their own once connectivity
    /// returns.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout)
    }
}
