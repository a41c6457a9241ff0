//! Sync orchestration: per-record status, triggers, and attempt lifecycle.
//!
//! The orchestrator owns the in-memory status map and everything flows
//! through it: local mutations and connectivity transitions schedule
//! attempts, an attempt reconciles one record against the remote, and every
//! status transition is broadcast to subscribers.
//!
//! Concurrency model: the status map sits behind a plain mutex that is
//! never held across an await. Scheduling is a check-and-set inside that
//! critical section, which is what makes "at most one attempt in flight per
//! record" hold: a trigger that finds an attempt already running coalesces
//! into it. Attempts for distinct records run in parallel without
//! constraint.
//!
//! The attempt itself never trusts its own snapshot: it re-reads the record
//! at the start, and concludes through the store's conditional write-backs,
//! keyed on the timestamp it read. A local edit that lands mid-flight makes
//! the write-back miss; the attempt is then superseded and a follow-up is
//! scheduled for the newer edit.

use crate::connectivity::ConnectivityMonitor;
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteStore;
use crate::resolver::{resolve, SyncAction};
use jotter_storage::NoteStore;
use jotter_types::{Note, NoteId, RemoteNote, SyncStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Configuration for the sync orchestrator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Hard deadline for one whole attempt (ms). The HTTP client enforces
    /// its own per-request timeout; this bounds the attempt end to end so a
    /// record can never wedge in `Syncing`.
    pub attempt_timeout_ms: u64,
    /// Capacity of the status event channel.
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: 30_000,
            event_capacity: 64,
        }
    }
}

/// Status notifications, broadcast to all subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A record's sync status changed.
    StatusChanged { id: NoteId, status: SyncStatus },
}

/// Tracked state for one record.
///
/// `in_flight` is deliberately separate from the visible status: a mutation
/// during an attempt resets the status to `Unsynced` (the caller sees the
/// truth immediately) while `in_flight` stays set so no second attempt can
/// be scheduled until the running one concludes.
#[derive(Debug, Clone, Copy)]
struct Tracked {
    status: SyncStatus,
    in_flight: bool,
}

/// How a concluded attempt left the record.
enum AttemptOutcome {
    /// Reconciled and flagged; the record agrees with the remote.
    Completed,
    /// A local edit landed mid-flight; the conditional write-back declined.
    Superseded,
    /// The record disappeared from the store before the attempt read it.
    Vanished,
}

/// Drives synchronization for all records.
///
/// Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    store: NoteStore,
    remote: Arc<dyn RemoteStore>,
    connectivity: ConnectivityMonitor,
    /// Per-record tracked state. Entry presence mirrors record existence:
    /// deleting a note purges its entry, which is also what discards an
    /// in-flight attempt's outcome.
    statuses: Mutex<HashMap<NoteId, Tracked>>,
    events: broadcast::Sender<SyncEvent>,
    listener: Mutex<Option<JoinHandle<()>>>,
    config: SyncConfig,
}

impl Inner {
    /// Writes a record's tracked state and broadcasts the status if it
    /// actually changed. Caller holds the statuses lock.
    fn track(
        &self,
        statuses: &mut HashMap<NoteId, Tracked>,
        id: NoteId,
        status: SyncStatus,
        in_flight: bool,
    ) {
        let previous = statuses.insert(id, Tracked { status, in_flight });
        if previous.map(|t| t.status) != Some(status) {
            let _ = self.events.send(SyncEvent::StatusChanged { id, status });
        }
    }
}

impl SyncOrchestrator {
    /// Creates an orchestrator. Call [`start`](Self::start) to seed statuses
    /// from the store and begin listening for connectivity transitions.
    #[must_use]
    pub fn new(
        store: NoteStore,
        remote: Arc<dyn RemoteStore>,
        connectivity: ConnectivityMonitor,
        config: SyncConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            inner: Arc::new(Inner {
                store,
                remote,
                connectivity,
                statuses: Mutex::new(HashMap::new()),
                events,
                listener: Mutex::new(None),
                config,
            }),
        }
    }

    /// Seeds statuses from the persisted synced flags, spawns the
    /// connectivity listener, and runs one catch-up scan if currently
    /// online (records edited while the app was closed should not wait for
    /// the next transition). Calling `start` on an already started
    /// orchestrator is a no-op.
    pub async fn start(&self) -> SyncResult<()> {
        if self.inner.listener.lock().unwrap().is_some() {
            debug!("sync orchestrator already started");
            return Ok(());
        }

        // Subscribe before anything awaits. A transition from here on is
        // either pending in this receiver or visible to the catch-up check
        // below; the listener task may be polled arbitrarily late without
        // missing it.
        let rx = self.inner.connectivity.subscribe();

        let store = self.inner.store.clone();
        let notes = tokio::task::spawn_blocking(move || store.list())
            .await
            .map_err(|e| SyncError::TaskFailed(e.to_string()))??;

        {
            let mut statuses = self.inner.statuses.lock().unwrap();
            for note in &notes {
                let status = if note.synced {
                    SyncStatus::Synced
                } else {
                    SyncStatus::Unsynced
                };
                // An entry tracked before start reflects a mutation newer
                // than the persisted flag; leave it alone.
                statuses.entry(note.id).or_insert(Tracked {
                    status,
                    in_flight: false,
                });
            }
        }
        info!("sync orchestrator started, tracking {} records", notes.len());

        {
            let mut listener = self.inner.listener.lock().unwrap();
            if listener.is_none() {
                *listener = Some(tokio::spawn(connectivity_listener(
                    Arc::clone(&self.inner),
                    rx,
                )));
            }
        }

        if self.inner.connectivity.current() {
            scan_and_schedule(&self.inner);
        }
        Ok(())
    }

    /// Stops the connectivity listener. In-flight attempts run to their
    /// conclusion and land through the normal outcome handling.
    pub fn stop(&self) {
        if let Some(handle) = self.inner.listener.lock().unwrap().take() {
            handle.abort();
            info!("sync orchestrator stopped");
        }
    }

    /// Mutation trigger: the record changed locally. Status resets to
    /// `Unsynced`; if online and no attempt is in flight, one is scheduled.
    /// While offline the record simply stays unsynced until a connectivity
    /// trigger picks it up.
    pub fn note_mutated(&self, id: NoteId) {
        let in_flight = {
            let mut statuses = self.inner.statuses.lock().unwrap();
            let in_flight = statuses.get(&id).is_some_and(|t| t.in_flight);
            self.inner
                .track(&mut statuses, id, SyncStatus::Unsynced, in_flight);
            in_flight
        };

        if in_flight {
            // The running attempt will miss its conditional write-back and
            // reschedule; starting a second attempt here would break the
            // one-in-flight rule.
            debug!("note {id} mutated mid-flight, coalescing");
            return;
        }

        if self.inner.connectivity.current() {
            try_schedule(&self.inner, id);
        } else {
            debug!("note {id} mutated while offline, queued for reconnect");
        }
    }

    /// Deletion trigger: stop tracking the record. An in-flight attempt's
    /// outcome is discarded when it concludes, and its conditional
    /// write-backs can no longer match the deleted row.
    pub fn note_removed(&self, id: NoteId) {
        let removed = self.inner.statuses.lock().unwrap().remove(&id);
        if removed.is_some() {
            debug!("note {id} removed from sync tracking");
        }
    }

    /// Forgets every tracked record (bulk local wipe).
    pub fn clear(&self) {
        self.inner.statuses.lock().unwrap().clear();
    }

    /// Manual re-trigger for one record, the retry path for `Error`.
    /// Returns whether an attempt was scheduled. No-op while offline.
    pub fn resync(&self, id: NoteId) -> bool {
        if !self.inner.connectivity.current() {
            debug!("resync of note {id} skipped, offline");
            return false;
        }
        try_schedule(&self.inner, id)
    }

    /// Re-triggers every record currently `Unsynced` or `Error`. No-op
    /// while offline.
    pub fn resync_all(&self) {
        if !self.inner.connectivity.current() {
            debug!("resync_all skipped, offline");
            return;
        }
        scan_and_schedule(&self.inner);
    }

    /// Current status of one record. `None` for unknown or deleted ids.
    #[must_use]
    pub fn status(&self, id: &NoteId) -> Option<SyncStatus> {
        self.inner
            .statuses
            .lock()
            .unwrap()
            .get(id)
            .map(|t| t.status)
    }

    /// Snapshot of every tracked record's status.
    #[must_use]
    pub fn statuses(&self) -> HashMap<NoteId, SyncStatus> {
        self.inner
            .statuses
            .lock()
            .unwrap()
            .iter()
            .map(|(id, t)| (*id, t.status))
            .collect()
    }

    /// Subscribes to status change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }
}

// ── Triggers ─────────────────────────────────────────────────────

/// Watches the monitor and fires the connectivity trigger on every wake
/// that observes the online state. The watch channel coalesces rapid
/// flips, so one wake can stand for several transitions; scheduling keys
/// off the state observed now, not off which edge produced the wake (an
/// offline burst that ends back online would otherwise be dropped). The
/// receiver is created by `start`, so no transition predates the
/// subscription. Runs on its own task, so the side calling `set_online` is
/// never blocked by scheduling work.
async fn connectivity_listener(inner: Arc<Inner>, mut rx: watch::Receiver<bool>) {
    while rx.changed().await.is_ok() {
        let online = *rx.borrow_and_update();
        if online {
            info!("connectivity restored, scheduling unsynced records");
            scan_and_schedule(&inner);
        }
    }
    debug!("connectivity listener stopped, monitor dropped");
}

/// Schedules every record currently `Unsynced` or `Error`.
fn scan_and_schedule(inner: &Arc<Inner>) {
    let candidates: Vec<NoteId> = {
        let statuses = inner.statuses.lock().unwrap();
        statuses
            .iter()
            .filter(|(_, t)| matches!(t.status, SyncStatus::Unsynced | SyncStatus::Error))
            .map(|(id, _)| *id)
            .collect()
    };
    if candidates.is_empty() {
        return;
    }
    debug!("scheduling {} unsynced records", candidates.len());
    for id in candidates {
        try_schedule(inner, id);
    }
}

/// Check-and-set scheduling: transitions the record to `Syncing` and spawns
/// an attempt, unless one is already in flight (the trigger coalesces) or
/// there is nothing to do.
fn try_schedule(inner: &Arc<Inner>, id: NoteId) -> bool {
    {
        let mut statuses = inner.statuses.lock().unwrap();
        let Some(tracked) = statuses.get(&id).copied() else {
            return false;
        };
        if tracked.in_flight {
            debug!("note {id} already has an attempt in flight, coalescing");
            return false;
        }
        if !matches!(tracked.status, SyncStatus::Unsynced | SyncStatus::Error) {
            return false;
        }
        inner.track(&mut statuses, id, SyncStatus::Syncing, true);
    }
    debug!("note {id} sync attempt scheduled");
    tokio::spawn(run_attempt(Arc::clone(inner), id));
    true
}

// ── Attempt lifecycle ────────────────────────────────────────────

/// Runs one attempt under the configured deadline and applies its outcome.
async fn run_attempt(inner: Arc<Inner>, id: NoteId) {
    let deadline = Duration::from_millis(inner.config.attempt_timeout_ms);
    let outcome = match tokio::time::timeout(deadline, attempt(&inner, id)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(SyncError::Timeout),
    };
    conclude(&inner, id, outcome);
}

/// One reconciliation pass for one record. Runs entirely outside the
/// status lock.
async fn attempt(inner: &Arc<Inner>, id: NoteId) -> SyncResult<AttemptOutcome> {
    // Fresh read; never reconcile from a cached snapshot.
    let store = inner.store.clone();
    let local = tokio::task::spawn_blocking(move || store.get(&id))
        .await
        .map_err(|e| SyncError::TaskFailed(e.to_string()))??;

    let Some(local) = local else {
        return Ok(AttemptOutcome::Vanished);
    };

    if local.synced {
        // Nothing changed since the last reconciliation; no remote traffic.
        debug!("note {id} already synced, attempt is a no-op");
        return Ok(AttemptOutcome::Completed);
    }

    let remote = inner.remote.fetch(&id).await?;
    let action = resolve(&local, remote.as_ref());
    debug!("note {id} resolved to {action:?}");

    match (action, remote) {
        (SyncAction::PushLocal, None) => {
            inner.remote.create(&local.to_remote()).await?;
            mark_synced(inner, &local).await
        }
        (SyncAction::PushLocal, Some(_)) => {
            inner.remote.replace(&local.to_remote()).await?;
            mark_synced(inner, &local).await
        }
        (SyncAction::AdoptRemote, Some(remote)) => adopt_remote(inner, &local, remote).await,
        // The resolver never adopts when the remote record is absent.
        (SyncAction::Noop, _) | (SyncAction::AdoptRemote, None) => {
            mark_synced(inner, &local).await
        }
    }
}

/// Concluding write-back for push and no-op attempts: flag the row synced
/// if it still carries the timestamp the attempt read.
async fn mark_synced(inner: &Arc<Inner>, local: &Note) -> SyncResult<AttemptOutcome> {
    let store = inner.store.clone();
    let id = local.id;
    let as_of = local.updated_at;
    let hit = tokio::task::spawn_blocking(move || store.mark_synced_if_unmodified(&id, as_of))
        .await
        .map_err(|e| SyncError::TaskFailed(e.to_string()))??;
    Ok(if hit {
        AttemptOutcome::Completed
    } else {
        AttemptOutcome::Superseded
    })
}

/// Concluding write-back for adopt attempts: replace content and timestamp
/// if the row still carries the timestamp the attempt read.
async fn adopt_remote(
    inner: &Arc<Inner>,
    local: &Note,
    remote: RemoteNote,
) -> SyncResult<AttemptOutcome> {
    let store = inner.store.clone();
    let as_of = local.updated_at;
    let hit = tokio::task::spawn_blocking(move || store.adopt_remote_if_unmodified(&remote, as_of))
        .await
        .map_err(|e| SyncError::TaskFailed(e.to_string()))??;
    Ok(if hit {
        AttemptOutcome::Completed
    } else {
        AttemptOutcome::Superseded
    })
}

/// Applies an attempt's outcome to the status map.
///
/// If the record's entry is gone the note was deleted mid-flight and
/// everything is discarded. If the status is no longer `Syncing` a mutation
/// raced the attempt; the record stays `Unsynced` and goes again.
fn conclude(inner: &Arc<Inner>, id: NoteId, outcome: SyncResult<AttemptOutcome>) {
    let reschedule = {
        let mut statuses = inner.statuses.lock().unwrap();
        let Some(tracked) = statuses.get(&id).copied() else {
            debug!("note {id} attempt outcome discarded, record deleted");
            return;
        };
        let dirtied = tracked.status != SyncStatus::Syncing;

        match outcome {
            Ok(AttemptOutcome::Completed) => {
                if dirtied {
                    // An edit landed after the write-back hit; keep it
                    // unsynced and go again.
                    inner.track(&mut statuses, id, SyncStatus::Unsynced, false);
                    true
                } else {
                    inner.track(&mut statuses, id, SyncStatus::Synced, false);
                    debug!("note {id} synced");
                    false
                }
            }
            Ok(AttemptOutcome::Superseded) => {
                debug!("note {id} attempt superseded by a newer local edit");
                inner.track(&mut statuses, id, SyncStatus::Unsynced, false);
                true
            }
            Ok(AttemptOutcome::Vanished) => {
                debug!("note {id} vanished before the attempt ran");
                statuses.remove(&id);
                false
            }
            Err(e) => {
                match &e {
                    SyncError::Storage(_) => {
                        error!("note {id} sync attempt hit a storage failure: {e}");
                    }
                    e if e.is_transient() => {
                        info!("note {id} sync attempt failed, will retry on reconnect: {e}");
                    }
                    _ => warn!("note {id} sync attempt failed: {e}"),
                }
                if dirtied {
                    // The pending edit still deserves its deferred attempt.
                    inner.track(&mut statuses, id, SyncStatus::Unsynced, false);
                    true
                } else {
                    inner.track(&mut statuses, id, SyncStatus::Error, false);
                    false
                }
            }
        }
    };

    if reschedule && inner.connectivity.current() {
        try_schedule(inner, id);
    }
}
