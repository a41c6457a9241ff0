//! Note records: the local durable form, the wire form, and sync status.

use crate::{NoteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A note as persisted in the local store.
///
/// `synced` is the durable flag behind sync state across restarts: true
/// means the record was in agreement with the remote the last time a sync
/// attempt concluded. Any local edit clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    pub updated_at: Timestamp,
    pub synced: bool,
}

impl Note {
    /// Creates a fresh unsynced note stamped at the current time.
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: NoteId::new(),
            title: title.into(),
            body: body.into(),
            updated_at: Timestamp::now(),
            synced: false,
        }
    }

    /// The wire form of this note. The synced flag is local bookkeeping and
    /// never leaves the device.
    #[must_use]
    pub fn to_remote(&self) -> RemoteNote {
        RemoteNote {
            id: self.id,
            title: self.title.clone(),
            body: self.body.clone(),
            updated_at: self.updated_at,
        }
    }

    /// Returns true if title and body match the remote record.
    /// The timestamp is ordering metadata, not content.
    #[must_use]
    pub fn content_matches(&self, remote: &RemoteNote) -> bool {
        self.title == remote.title && self.body == remote.body
    }
}

/// A note as exchanged with the remote store.
///
/// Wire JSON: `{"id", "title", "body", "updatedAt"}` with `updatedAt` an
/// RFC 3339 string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNote {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: Timestamp,
}

impl RemoteNote {
    /// Converts into a local record. A record just adopted from the remote
    /// is in agreement with it, so it lands flagged synced.
    #[must_use]
    pub fn into_note(self) -> Note {
        Note {
            id: self.id,
            title: self.title,
            body: self.body,
            updated_at: self.updated_at,
            synced: true,
        }
    }
}

/// Per-record synchronization state.
///
/// Only the synced/unsynced distinction is persisted (as [`Note::synced`]);
/// `Syncing` and `Error` are runtime-only and never survive a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local changes not yet reconciled with the remote.
    Unsynced,
    /// A sync attempt is in flight.
    Syncing,
    /// In agreement with the remote as of the last concluded attempt.
    Synced,
    /// The last attempt failed; waits for an external re-trigger.
    Error,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unsynced => "unsynced",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}
