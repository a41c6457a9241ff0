//! Core type definitions for Jotter.
//!
//! This crate defines the fundamental types shared by the storage and sync
//! layers:
//! - Note identifiers (UUID v4)
//! - Millisecond modification timestamps (the last-write-wins ordering key)
//! - The local note record, its wire form, and per-record sync status
//!
//! Presentation concerns (rendering, previews, search) belong to the host
//! application, not here.

mod ids;
mod note;
mod timestamp;

pub use ids::NoteId;
pub use note::{Note, RemoteNote, SyncStatus};
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
