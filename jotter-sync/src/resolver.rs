//! Last-write-wins conflict resolution.
//!
//! Pure decision logic: no I/O, no clocks. Given the freshly read local
//! record and the remote's current version (if any), decide what the sync
//! attempt does next.

use jotter_types::{Note, RemoteNote};

/// What a sync attempt should do for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Local is authoritative: create or replace the remote record.
    PushLocal,
    /// Remote is authoritative: overwrite local content and timestamp.
    AdoptRemote,
    /// Already in agreement; nothing to transfer.
    Noop,
}

/// Decides between the local and remote versions of a record.
///
/// Rules, in order:
/// 1. No remote record: push. The record has never been uploaded (or was
///    deleted remotely) and the local copy is all there is.
/// 2. Local strictly newer: push.
/// 3. Local not newer and content differs: adopt remote. Equal timestamps
///    with differing content land here too, so the tie resolves remote-wins
///    on every replica.
/// 4. Content equal: nothing to do. The attempt still sets the local
///    synced flag.
#[must_use]
pub fn resolve(local: &Note, remote: Option<&RemoteNote>) -> SyncAction {
    let Some(remote) = remote else {
        return SyncAction::PushLocal;
    };

    if local.updated_at > remote.updated_at {
        SyncAction::PushLocal
    } else if !local.content_matches(remote) {
        SyncAction::AdoptRemote
    } else {
        SyncAction::Noop
    }
}
