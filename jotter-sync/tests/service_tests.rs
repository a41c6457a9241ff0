use jotter_storage::NoteStore;
use jotter_sync::remote::mock::{MockRemote, RemoteCall};
use jotter_sync::{create_note_service, ConnectivityMonitor, NoteService, SyncConfig, SyncError};
use jotter_types::{Note, NoteId, SyncStatus, Timestamp};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn make_service(online: bool) -> (NoteService, NoteStore, MockRemote, ConnectivityMonitor) {
    init_tracing();
    let store = NoteStore::open_in_memory().unwrap();
    let remote = MockRemote::new();
    let connectivity = ConnectivityMonitor::new(online);
    let service = create_note_service(
        store.clone(),
        Arc::new(remote.clone()),
        connectivity.clone(),
        SyncConfig::default(),
    )
    .await
    .unwrap();
    (service, store, remote, connectivity)
}

async fn wait_for_status(service: &NoteService, id: &NoteId, want: SyncStatus) {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if service.sync_status(id) == Some(want) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "note never reached {want:?}, currently {:?}",
            service.sync_status(id)
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ── CRUD ────────────────────────────────────────────────────────

#[tokio::test]
async fn create_persists_and_queues_sync() {
    let (service, store, remote, _connectivity) = make_service(true).await;

    let note = service.create("groceries", "milk").await.unwrap();
    assert!(!note.synced);
    assert_eq!(store.get(&note.id).unwrap().unwrap().title, "groceries");

    wait_for_status(&service, &note.id, SyncStatus::Synced).await;
    assert_eq!(remote.get(&note.id).unwrap().body, "milk");
}

#[tokio::test]
async fn list_is_newest_first() {
    let (service, _store, _remote, _connectivity) = make_service(false).await;

    let first = service.create("first", "a").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = service.create("second", "b").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let third = service.create("third", "c").await.unwrap();

    let ids: Vec<NoteId> = service.list().await.unwrap().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);
}

#[tokio::test]
async fn update_restamps_and_clears_the_flag() {
    let (service, store, _remote, _connectivity) = make_service(true).await;

    let note = service.create("groceries", "milk").await.unwrap();
    wait_for_status(&service, &note.id, SyncStatus::Synced).await;

    let updated = service
        .update(note.id, "groceries", "milk, eggs")
        .await
        .unwrap();
    assert!(updated.updated_at > note.updated_at);
    assert!(!updated.synced);
    assert_eq!(store.get(&note.id).unwrap().unwrap().body, "milk, eggs");

    wait_for_status(&service, &note.id, SyncStatus::Synced).await;
}

#[tokio::test]
async fn update_missing_note_is_not_found() {
    let (service, _store, _remote, _connectivity) = make_service(true).await;
    assert!(matches!(
        service.update(NoteId::new(), "a", "b").await,
        Err(SyncError::NotFound(_))
    ));
}

#[tokio::test]
async fn get_returns_the_stored_note() {
    let (service, _store, _remote, _connectivity) = make_service(false).await;
    let note = service.create("groceries", "milk").await.unwrap();
    assert_eq!(service.get(note.id).await.unwrap().unwrap(), note);
    assert!(service.get(NoteId::new()).await.unwrap().is_none());
}

// ── Deletion ────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_locally_and_remotely() {
    let (service, store, remote, _connectivity) = make_service(true).await;
    let note = service.create("groceries", "milk").await.unwrap();
    wait_for_status(&service, &note.id, SyncStatus::Synced).await;

    service.delete(note.id).await.unwrap();
    assert!(store.get(&note.id).unwrap().is_none());
    assert_eq!(service.sync_status(&note.id), None);

    // The remote delete is fire-and-forget; give it a beat.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(remote.get(&note.id).is_none());
    assert!(remote.calls().contains(&RemoteCall::Delete(note.id)));
}

#[tokio::test]
async fn delete_swallows_remote_failure() {
    let (service, store, remote, _connectivity) = make_service(true).await;
    let note = service.create("groceries", "milk").await.unwrap();
    wait_for_status(&service, &note.id, SyncStatus::Synced).await;

    remote.set_network_down(true);
    service.delete(note.id).await.unwrap();
    assert!(store.get(&note.id).unwrap().is_none());

    // The orphan stays on the remote; the local deletion holds regardless.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(remote.get(&note.id).is_some());
    assert!(store.get(&note.id).unwrap().is_none());
}

#[tokio::test]
async fn delete_offline_skips_the_remote() {
    let (service, store, remote, _connectivity) = make_service(false).await;
    let note = service.create("groceries", "milk").await.unwrap();

    service.delete(note.id).await.unwrap();
    assert!(store.get(&note.id).unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(remote.call_count(), 0);
}

// ── Bulk wipe ───────────────────────────────────────────────────

#[tokio::test]
async fn clear_wipes_notes_and_tracking() {
    let (service, _store, _remote, _connectivity) = make_service(false).await;
    service.create("one", "a").await.unwrap();
    service.create("two", "b").await.unwrap();
    assert_eq!(service.sync_statuses().len(), 2);

    service.clear().await.unwrap();
    assert!(service.list().await.unwrap().is_empty());
    assert!(service.sync_statuses().is_empty());
}

// ── End to end ──────────────────────────────────────────────────

#[tokio::test]
async fn offline_note_syncs_after_reconnect() {
    let (service, store, remote, connectivity) = make_service(false).await;

    let note = service.create("trip", "pack socks").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(service.sync_status(&note.id), Some(SyncStatus::Unsynced));
    assert_eq!(remote.call_count(), 0);

    connectivity.set_online(true);
    wait_for_status(&service, &note.id, SyncStatus::Synced).await;

    assert_eq!(remote.get(&note.id).unwrap().body, "pack socks");
    assert!(store.get(&note.id).unwrap().unwrap().synced);
}

#[tokio::test]
async fn replicas_converge_on_last_write() {
    init_tracing();
    let remote = MockRemote::new();
    let id = NoteId::new();

    // Two devices edited the same note while offline; device A wrote last.
    let store_a = NoteStore::open_in_memory().unwrap();
    store_a
        .upsert(&Note {
            id,
            title: "trip".to_string(),
            body: "pack socks and passport".to_string(),
            updated_at: Timestamp::from_unix_millis(1_005),
            synced: false,
        })
        .unwrap();
    let store_b = NoteStore::open_in_memory().unwrap();
    store_b
        .upsert(&Note {
            id,
            title: "trip".to_string(),
            body: "pack socks".to_string(),
            updated_at: Timestamp::from_unix_millis(1_000),
            synced: false,
        })
        .unwrap();

    let service_a = create_note_service(
        store_a.clone(),
        Arc::new(remote.clone()),
        ConnectivityMonitor::new(true),
        SyncConfig::default(),
    )
    .await
    .unwrap();
    wait_for_status(&service_a, &id, SyncStatus::Synced).await;

    let service_b = create_note_service(
        store_b.clone(),
        Arc::new(remote.clone()),
        ConnectivityMonitor::new(true),
        SyncConfig::default(),
    )
    .await
    .unwrap();
    wait_for_status(&service_b, &id, SyncStatus::Synced).await;

    // Device B adopted A's later write; every copy agrees.
    assert_eq!(remote.len(), 1);
    assert_eq!(remote.get(&id).unwrap().body, "pack socks and passport");
    assert_eq!(
        service_a.list().await.unwrap(),
        service_b.list().await.unwrap()
    );
}

#[tokio::test]
async fn sync_state_survives_restart() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");
    let remote = MockRemote::new();

    let note_id = {
        let store = NoteStore::open(&path).unwrap();
        let service = create_note_service(
            store,
            Arc::new(remote.clone()),
            ConnectivityMonitor::new(true),
            SyncConfig::default(),
        )
        .await
        .unwrap();
        let note = service.create("trip", "pack socks").await.unwrap();
        wait_for_status(&service, &note.id, SyncStatus::Synced).await;
        service.orchestrator().stop();
        note.id
    };
    let settled = remote.call_count();

    // A fresh process over the same database trusts the persisted flag
    // and generates no traffic of its own.
    let store = NoteStore::open(&path).unwrap();
    let service = create_note_service(
        store,
        Arc::new(remote.clone()),
        ConnectivityMonitor::new(false),
        SyncConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(service.sync_status(&note_id), Some(SyncStatus::Synced));
    assert_eq!(remote.call_count(), settled);
}

#[tokio::test]
async fn failed_note_recovers_after_reconnect() {
    let (service, _store, remote, connectivity) = make_service(true).await;
    remote.set_network_down(true);

    let note = service.create("trip", "pack socks").await.unwrap();
    wait_for_status(&service, &note.id, SyncStatus::Error).await;

    remote.set_network_down(false);
    connectivity.set_online(false);
    tokio::time::sleep(Duration::from_millis(20)).await;
    connectivity.set_online(true);

    wait_for_status(&service, &note.id, SyncStatus::Synced).await;
    assert_eq!(remote.get(&note.id).unwrap().body, "pack socks");
}
