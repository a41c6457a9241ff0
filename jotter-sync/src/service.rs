//! Application-facing note operations.
//!
//! Every local operation completes against the store first and returns
//! immediately; synchronization happens behind the scenes via the
//! orchestrator. The service never blocks a caller on the network.

use crate::connectivity::ConnectivityMonitor;
use crate::error::{SyncError, SyncResult};
use crate::orchestrator::{SyncConfig, SyncEvent, SyncOrchestrator};
use crate::remote::RemoteStore;
use jotter_storage::NoteStore;
use jotter_types::{Note, NoteId, SyncStatus, Timestamp};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// High-level note CRUD with background synchronization.
///
/// Cheap to clone; all clones share the same store and orchestrator.
#[derive(Clone)]
pub struct NoteService {
    store: NoteStore,
    remote: Arc<dyn RemoteStore>,
    connectivity: ConnectivityMonitor,
    orchestrator: SyncOrchestrator,
}

/// Builds a service wired to the given store, remote, and monitor, and
/// starts its orchestrator (seeding statuses and running the initial
/// catch-up scan if online).
pub async fn create_note_service(
    store: NoteStore,
    remote: Arc<dyn RemoteStore>,
    connectivity: ConnectivityMonitor,
    config: SyncConfig,
) -> SyncResult<NoteService> {
    let orchestrator = SyncOrchestrator::new(
        store.clone(),
        Arc::clone(&remote),
        connectivity.clone(),
        config,
    );
    orchestrator.start().await?;
    Ok(NoteService {
        store,
        remote,
        connectivity,
        orchestrator,
    })
}

impl NoteService {
    /// Creates a note and queues it for synchronization.
    pub async fn create(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> SyncResult<Note> {
        let note = Note::new(title, body);
        self.persist(note.clone()).await?;
        debug!("created note {}", note.id);
        self.orchestrator.note_mutated(note.id);
        Ok(note)
    }

    /// Replaces a note's content, restamps it, and queues it for
    /// synchronization. The new timestamp is strictly greater than the old
    /// one even under clock skew, so the edit always wins last-write-wins
    /// against the state it replaced.
    pub async fn update(
        &self,
        id: NoteId,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> SyncResult<Note> {
        let current = self.fetch_local(id).await?.ok_or(SyncError::NotFound(id))?;
        let note = Note {
            id,
            title: title.into(),
            body: body.into(),
            updated_at: Timestamp::next_after(current.updated_at),
            synced: false,
        };
        self.persist(note.clone()).await?;
        debug!("updated note {id}");
        self.orchestrator.note_mutated(id);
        Ok(note)
    }

    /// Deletes a note locally. If online, a best-effort remote delete is
    /// fired in the background; its failure is logged, never surfaced, and
    /// never resurrects the local record.
    pub async fn delete(&self, id: NoteId) -> SyncResult<()> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.remove(&id))
            .await
            .map_err(|e| SyncError::TaskFailed(e.to_string()))??;
        self.orchestrator.note_removed(id);
        debug!("deleted note {id}");

        if self.connectivity.current() {
            let remote = Arc::clone(&self.remote);
            tokio::spawn(async move {
                if let Err(e) = remote.delete(&id).await {
                    warn!("best-effort remote delete of note {id} failed: {e}");
                }
            });
        }
        Ok(())
    }

    /// All notes, most recently updated first.
    pub async fn list(&self) -> SyncResult<Vec<Note>> {
        let store = self.store.clone();
        let mut notes = tokio::task::spawn_blocking(move || store.list())
            .await
            .map_err(|e| SyncError::TaskFailed(e.to_string()))??;
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    /// One note by id, or `None`.
    pub async fn get(&self, id: NoteId) -> SyncResult<Option<Note>> {
        self.fetch_local(id).await
    }

    /// Wipes every local note and all sync tracking. The remote is left
    /// untouched.
    pub async fn clear(&self) -> SyncResult<()> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.clear())
            .await
            .map_err(|e| SyncError::TaskFailed(e.to_string()))??;
        self.orchestrator.clear();
        Ok(())
    }

    /// Sync status of one note. `None` for unknown or deleted ids.
    #[must_use]
    pub fn sync_status(&self, id: &NoteId) -> Option<SyncStatus> {
        self.orchestrator.status(id)
    }

    /// Snapshot of every note's sync status.
    #[must_use]
    pub fn sync_statuses(&self) -> HashMap<NoteId, SyncStatus> {
        self.orchestrator.statuses()
    }

    /// Subscribes to sync status change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.orchestrator.subscribe()
    }

    /// Manually re-triggers synchronization of one note (the retry path
    /// for notes in the error state). Returns whether an attempt was
    /// scheduled.
    pub fn resync(&self, id: NoteId) -> bool {
        self.orchestrator.resync(id)
    }

    /// Re-triggers every unsynced or errored note.
    pub fn resync_all(&self) {
        self.orchestrator.resync_all();
    }

    /// The orchestrator backing this service.
    #[must_use]
    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    async fn persist(&self, note: Note) -> SyncResult<()> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.upsert(&note))
            .await
            .map_err(|e| SyncError::TaskFailed(e.to_string()))??;
        Ok(())
    }

    async fn fetch_local(&self, id: NoteId) -> SyncResult<Option<Note>> {
        let store = self.store.clone();
        let note = tokio::task::spawn_blocking(move || store.get(&id))
            .await
            .map_err(|e| SyncError::TaskFailed(e.to_string()))??;
        Ok(note)
    }
}
