//! SQLite storage layer for Jotter.
//!
//! Provides the durable local store for note records. The local store is
//! always authoritative for reads; the sync layer reconciles it with the
//! remote but never bypasses or shadows it.
//!
//! # Architecture
//!
//! - One `notes` table, one row per record, typed columns
//! - Modification times stored as raw Unix milliseconds so the conditional
//!   write-backs (`mark_synced_if_unmodified`, `adopt_remote_if_unmodified`)
//!   compare exactly
//! - The `synced` flag is the only piece of sync state that survives a
//!   restart

mod error;
mod note_store;

pub use error::{StorageError, StorageResult};
pub use note_store::NoteStore;
