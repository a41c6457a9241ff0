use jotter_sync::remote::RemoteStore;
use jotter_sync::{HttpRemote, RemoteConfig, SyncError};
use jotter_types::{NoteId, RemoteNote, Timestamp};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn remote_config(server: &MockServer) -> RemoteConfig {
    RemoteConfig {
        base_url: server.uri(),
        timeout_secs: 5,
    }
}

/// A port that was just bound and released, so nothing is listening on it.
fn dead_endpoint() -> RemoteConfig {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    RemoteConfig {
        base_url: format!("http://127.0.0.1:{port}"),
        timeout_secs: 1,
    }
}

fn remote_note(millis: i64, title: &str, body: &str) -> RemoteNote {
    RemoteNote {
        id: NoteId::new(),
        title: title.to_string(),
        body: body.to_string(),
        updated_at: Timestamp::from_unix_millis(millis),
    }
}

fn wire_json(note: &RemoteNote) -> serde_json::Value {
    serde_json::json!({
        "id": note.id.to_string(),
        "title": note.title,
        "body": note.body,
        "updatedAt": note.updated_at.to_rfc3339(),
    })
}

// ── Config defaults ─────────────────────────────────────────────

#[test]
fn remote_config_default() {
    let cfg = RemoteConfig::default();
    assert_eq!(cfg.base_url, "http://localhost:3001");
    assert_eq!(cfg.timeout_secs, 30);
}

// ── fetch ───────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_returns_note() {
    let server = MockServer::start().await;
    let note = remote_note(1_700_000_000_123, "groceries", "milk, eggs");

    Mock::given(method("GET"))
        .and(path(format!("/notes/{}", note.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(wire_json(&note)))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(remote_config(&server));
    let fetched = remote.fetch(&note.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, note.id);
    assert_eq!(fetched.title, "groceries");
    assert_eq!(fetched.body, "milk, eggs");
    assert_eq!(fetched.updated_at.unix_millis(), 1_700_000_000_123);
}

#[tokio::test]
async fn fetch_missing_note_is_none() {
    let server = MockServer::start().await;
    let id = NoteId::new();

    Mock::given(method("GET"))
        .and(path(format!("/notes/{id}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(remote_config(&server));
    assert!(remote.fetch(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn fetch_server_error_is_rejected() {
    let server = MockServer::start().await;
    let id = NoteId::new();

    Mock::given(method("GET"))
        .and(path(format!("/notes/{id}")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(remote_config(&server));
    match remote.fetch(&id).await {
        Err(SyncError::Rejected { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_undecodable_body_is_rejected() {
    let server = MockServer::start().await;
    let id = NoteId::new();

    Mock::given(method("GET"))
        .and(path(format!("/notes/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(remote_config(&server));
    assert!(matches!(
        remote.fetch(&id).await,
        Err(SyncError::Rejected { .. })
    ));
}

#[tokio::test]
async fn fetch_unreachable_server_is_network_error() {
    let remote = HttpRemote::new(dead_endpoint());
    assert!(matches!(
        remote.fetch(&NoteId::new()).await,
        Err(SyncError::Network(_))
    ));
}

// ── create / replace ────────────────────────────────────────────

#[tokio::test]
async fn create_posts_wire_format() {
    let server = MockServer::start().await;
    let note = remote_note(1_700_000_000_123, "groceries", "milk");

    Mock::given(method("POST"))
        .and(path("/notes"))
        .and(body_json(wire_json(&note)))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let remote = HttpRemote::new(remote_config(&server));
    remote.create(&note).await.unwrap();
}

#[tokio::test]
async fn create_rejection_carries_status() {
    let server = MockServer::start().await;
    let note = remote_note(100, "a", "b");

    Mock::given(method("POST"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad payload"))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(remote_config(&server));
    match remote.create(&note).await {
        Err(SyncError::Rejected { status, message }) => {
            assert_eq!(status, 422);
            assert!(message.contains("bad payload"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn replace_puts_to_note_url() {
    let server = MockServer::start().await;
    let note = remote_note(1_700_000_000_456, "groceries", "milk, eggs");

    Mock::given(method("PUT"))
        .and(path(format!("/notes/{}", note.id)))
        .and(body_json(wire_json(&note)))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let remote = HttpRemote::new(remote_config(&server));
    remote.replace(&note).await.unwrap();
}

// ── delete ──────────────────────────────────────────────────────

#[tokio::test]
async fn delete_succeeds() {
    let server = MockServer::start().await;
    let id = NoteId::new();

    Mock::given(method("DELETE"))
        .and(path(format!("/notes/{id}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let remote = HttpRemote::new(remote_config(&server));
    remote.delete(&id).await.unwrap();
}

#[tokio::test]
async fn delete_missing_note_is_success() {
    // Already absent means the goal state is reached.
    let server = MockServer::start().await;
    let id = NoteId::new();

    Mock::given(method("DELETE"))
        .and(path(format!("/notes/{id}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(remote_config(&server));
    remote.delete(&id).await.unwrap();
}

#[tokio::test]
async fn delete_server_error_is_rejected() {
    let server = MockServer::start().await;
    let id = NoteId::new();

    Mock::given(method("DELETE"))
        .and(path(format!("/notes/{id}")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(remote_config(&server));
    assert!(matches!(
        remote.delete(&id).await,
        Err(SyncError::Rejected { status: 500, .. })
    ));
}

// ── ping ────────────────────────────────────────────────────────

#[tokio::test]
async fn ping_reaches_responding_server() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(remote_config(&server));
    remote.ping().await.unwrap();
}

#[tokio::test]
async fn ping_treats_any_response_as_reachable() {
    // Reachability is about the network path, not server health.
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(remote_config(&server));
    remote.ping().await.unwrap();
}

#[tokio::test]
async fn ping_unreachable_server_is_network_error() {
    let remote = HttpRemote::new(dead_endpoint());
    assert!(matches!(remote.ping().await, Err(SyncError::Network(_))));
}
