//! In-memory remote store for tests.

use super::RemoteStore;
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use jotter_types::{NoteId, RemoteNote};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded call against the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    Fetch(NoteId),
    Create(NoteId),
    Replace(NoteId),
    Delete(NoteId),
    Ping,
}

/// An in-memory remote store with failure injection and a call log.
///
/// Clones share state, so a test can keep one handle while the sync stack
/// holds another, or two stacks can share one handle as a common "server".
#[derive(Clone, Default)]
pub struct MockRemote {
    inner: Arc<MockInner>,
}

#[derive(Default)]
struct MockInner {
    notes: Mutex<HashMap<NoteId, RemoteNote>>,
    calls: Mutex<Vec<RemoteCall>>,
    network_down: AtomicBool,
    reject_writes: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MockRemote {
    /// Creates an empty, reachable mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record directly, bypassing the call log.
    pub fn insert(&self, note: RemoteNote) {
        self.inner.notes.lock().unwrap().insert(note.id, note);
    }

    /// Reads a record directly, bypassing the call log.
    #[must_use]
    pub fn get(&self, id: &NoteId) -> Option<RemoteNote> {
        self.inner.notes.lock().unwrap().get(id).cloned()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.notes.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Simulates losing the network: every call fails with `Network`.
    pub fn set_network_down(&self, down: bool) {
        self.inner.network_down.store(down, Ordering::SeqCst);
    }

    /// Makes writes fail with `Rejected` while reads keep working.
    pub fn set_reject_writes(&self, reject: bool) {
        self.inner.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Adds artificial latency to every call, for in-flight interleaving
    /// tests.
    pub fn set_latency(&self, latency: Duration) {
        *self.inner.latency.lock().unwrap() = Some(latency);
    }

    /// Recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.calls.lock().unwrap().clone()
    }

    /// Total number of recorded calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inner.calls.lock().unwrap().len()
    }

    /// Empties the call log.
    pub fn clear_calls(&self) {
        self.inner.calls.lock().unwrap().clear();
    }

    /// Records the call, applies latency, then fails if the network is down.
    async fn begin(&self, call: RemoteCall) -> SyncResult<()> {
        self.inner.calls.lock().unwrap().push(call);
        let latency = *self.inner.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.inner.network_down.load(Ordering::SeqCst) {
            return Err(SyncError::Network("mock network down".to_string()));
        }
        Ok(())
    }

    fn check_writes(&self) -> SyncResult<()> {
        if self.inner.reject_writes.load(Ordering::SeqCst) {
            return Err(SyncError::Rejected {
                status: 500,
                message: "mock rejecting writes".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn fetch(&self, id: &NoteId) -> SyncResult<Option<RemoteNote>> {
        self.begin(RemoteCall::Fetch(*id)).await?;
        Ok(self.inner.notes.lock().unwrap().get(id).cloned())
    }

    async fn create(&self, note: &RemoteNote) -> SyncResult<()> {
        self.begin(RemoteCall::Create(note.id)).await?;
        self.check_writes()?;
        self.inner.notes.lock().unwrap().insert(note.id, note.clone());
        Ok(())
    }

    async fn replace(&self, note: &RemoteNote) -> SyncResult<()> {
        self.begin(RemoteCall::Replace(note.id)).await?;
        self.check_writes()?;
        self.inner.notes.lock().unwrap().insert(note.id, note.clone());
        Ok(())
    }

    async fn delete(&self, id: &NoteId) -> SyncResult<()> {
        self.begin(RemoteCall::Delete(*id)).await?;
        self.check_writes()?;
        self.inner.notes.lock().unwrap().remove(id);
        Ok(())
    }

    async fn ping(&self) -> SyncResult<()> {
        self.begin(RemoteCall::Ping).await
    }
}
