//! Offline-first synchronization engine for Jotter notes.
//!
//! Notes are always written to local storage first and pushed to the
//! remote in the background. The app keeps working with no connection;
//! records carry a visible sync status and reconcile automatically when
//! connectivity returns.
//!
//! # Architecture
//!
//! - **Connectivity**: An observable online/offline flag, fed manually or
//!   by a background reachability probe
//! - **Resolver**: Pure last-write-wins conflict decisions from a local
//!   and remote pair
//! - **Remote**: REST client for the notes server, plus an in-memory mock
//! - **Orchestrator**: Tracks per-record status, schedules attempts on
//!   mutation and reconnect, and enforces one attempt in flight per record
//! - **Service**: Application-facing CRUD that never blocks on the network
//!
//! # Sync Lifecycle
//!
//! 1. A mutation (or a reconnect) marks the record unsynced and schedules
//!    an attempt
//! 2. The attempt re-reads the record, fetches its remote counterpart, and
//!    resolves: push local, adopt remote, or nothing to do
//! 3. The outcome lands through a conditional write-back, so an edit that
//!    raced the attempt supersedes it and triggers a follow-up
//!
//! # Example
//!
//! ```no_run
//! use jotter_storage::NoteStore;
//! use jotter_sync::{create_note_service, ConnectivityMonitor, HttpRemote, RemoteConfig, SyncConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> jotter_sync::SyncResult<()> {
//! let store = NoteStore::open("notes.db".as_ref())?;
//! let remote = Arc::new(HttpRemote::new(RemoteConfig::default()));
//! let connectivity = ConnectivityMonitor::new(true);
//!
//! let service = create_note_service(store, remote, connectivity, SyncConfig::default()).await?;
//! let note = service.create("Groceries", "milk, eggs").await?;
//! println!("created {} ({:?})", note.id, service.sync_status(&note.id));
//! # Ok(())
//! # }
//! ```

mod connectivity;
mod error;
mod orchestrator;
pub mod remote;
mod resolver;
mod service;

pub use connectivity::{ConnectivityMonitor, ReachabilityProbe};
pub use error::{SyncError, SyncResult};
pub use orchestrator::{SyncConfig, SyncEvent, SyncOrchestrator};
pub use resolver::{resolve, SyncAction};
pub use service::{create_note_service, NoteService};

pub use remote::{HttpRemote, RemoteConfig, RemoteStore};
