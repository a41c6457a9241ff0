//! Remote REST store for note records.
//!
//! A thin client: exactly the operations the orchestrator needs, plus a
//! reachability ping for the connectivity probe. No retry logic lives here;
//! retry policy belongs to the orchestrator's triggers.

pub mod http;
pub mod mock;

use crate::error::SyncResult;
use async_trait::async_trait;
use jotter_types::{NoteId, RemoteNote};

pub use http::{HttpRemote, RemoteConfig};

/// Abstract remote store for note records.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetches a record. Remote 404 is `Ok(None)`: absence is a valid
    /// signal (it drives the create-vs-replace decision), not an error.
    async fn fetch(&self, id: &NoteId) -> SyncResult<Option<RemoteNote>>;

    /// Creates a record.
    async fn create(&self, note: &RemoteNote) -> SyncResult<()>;

    /// Replaces a record wholesale.
    async fn replace(&self, note: &RemoteNote) -> SyncResult<()>;

    /// Deletes a record. Remote 404 is success: the goal state (record
    /// absent) already holds.
    async fn delete(&self, id: &NoteId) -> SyncResult<()>;

    /// Cheap reachability check. Any HTTP answer counts as reachable; only
    /// transport failure does not.
    async fn ping(&self) -> SyncResult<()>;
}
