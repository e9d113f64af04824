//! Login/logout flows and the session-bound live channel against the stub
//! backend.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use binwatch_api::ApiClient;
use binwatch_core::validation::RegistrationForm;
use binwatch_dashboard::views::SensorFeed;
use binwatch_dashboard::{AuthFlow, ChannelSettings, ChannelSupervisor, ViewError};
use binwatch_live::ChannelState;
use binwatch_session::{FileStore, KeyValueStore, SessionStore};
use common::{within, Backend};
use serde_json::json;

fn session_at(path: &std::path::Path) -> (SessionStore, Arc<FileStore>) {
    let storage = Arc::new(FileStore::open(path).unwrap());
    (SessionStore::new(storage.clone()), storage)
}

fn flow_for(api_url: String, session: &SessionStore) -> AuthFlow {
    let api = ApiClient::new(api_url, Arc::new(session.clone())).unwrap();
    AuthFlow::new(Arc::new(api), session.clone())
}

#[tokio::test]
async fn login_persists_token_and_identity() {
    let stub = common::start(Backend::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let (session, storage) = session_at(&path);

    flow_for(stub.api_url(), &session)
        .login("alice", "secret123")
        .await
        .unwrap();

    let state = session.snapshot();
    assert!(state.is_authenticated());
    assert_eq!(state.user().unwrap().username, "alice");
    assert_eq!(storage.get("accessToken").unwrap().as_deref(), Some("tok-1"));

    // A fresh process restores the same session from disk.
    let (restored, _) = session_at(&path);
    restored.load_from_storage();
    assert_eq!(restored.snapshot().access_token(), Some("tok-1"));
}

#[tokio::test]
async fn bad_credentials_leave_session_untouched() {
    let stub = common::start(Backend::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let (session, storage) = session_at(&dir.path().join("session.json"));

    let err = flow_for(stub.api_url(), &session)
        .login("alice", "wrong")
        .await
        .unwrap_err();

    assert_eq!(err, ViewError::AuthFailed("Bad credentials".into()));
    let state = session.snapshot();
    assert!(!state.is_authenticated());
    assert!(!state.is_loading);
    assert_eq!(state.error.as_deref(), Some("Bad credentials"));
    assert_eq!(storage.get("accessToken").unwrap(), None);
}

#[tokio::test]
async fn rejected_login_without_message_says_login_failed() {
    let stub = common::start(Backend::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let (session, _storage) = session_at(&dir.path().join("session.json"));

    let err = flow_for(stub.api_url(), &session)
        .login("mute", "whatever")
        .await
        .unwrap_err();

    assert_eq!(err, ViewError::AuthFailed("Login failed".into()));
    assert_eq!(session.snapshot().error.as_deref(), Some("Login failed"));
}

#[tokio::test]
async fn logout_clears_storage_when_server_fails() {
    let stub = common::start(Backend {
        logout_fails: true,
        ..Default::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let (session, storage) = session_at(&dir.path().join("session.json"));
    let flow = flow_for(stub.api_url(), &session);

    flow.login("alice", "secret123").await.unwrap();
    flow.logout().await;

    assert!(!session.is_authenticated());
    assert_eq!(storage.get("accessToken").unwrap(), None);
    assert_eq!(storage.get("user").unwrap(), None);
}

#[tokio::test]
async fn taken_username_is_reported() {
    let stub = common::start(Backend::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let (session, _) = session_at(&dir.path().join("session.json"));

    let form = RegistrationForm {
        username: "taken".into(),
        email: "taken@example.com".into(),
        password: "secret123".into(),
        confirm_password: "secret123".into(),
    };
    let err = flow_for(stub.api_url(), &session).register(&form).await.unwrap_err();
    assert_matches!(err, ViewError::AuthFailed(msg) if msg == "Username already exists");
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn channel_follows_session_lifecycle() {
    let stub = common::start(Backend {
        push: vec![
            "not json".to_string(),
            json!({
                "topic": "data/bin-01/sensors",
                "message": {"node": "node1", "distance": 30.0, "temperature": 29.5},
                "timestamp": "2024-05-01T10:00:00Z"
            })
            .to_string(),
        ],
        ..Default::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let (session, _) = session_at(&dir.path().join("session.json"));
    let supervisor = ChannelSupervisor::spawn(&session, ChannelSettings::new(stub.ws_url()));
    assert!(supervisor.current().is_none());

    flow_for(stub.api_url(), &session)
        .login("alice", "secret123")
        .await
        .unwrap();

    let mut channels = supervisor.watch();
    let channel = within(channels.wait_for(|c| c.is_some()))
        .await
        .unwrap()
        .clone()
        .unwrap();
    let mut state = channel.watch_state();
    within(state.wait_for(|s| *s == ChannelState::Open)).await.unwrap();

    let mut feed = SensorFeed::new("bin-01");
    feed.attach(&channel);
    let mut updates = feed.updates();
    channel.send("/app/replay", json!({}));
    within(updates.changed()).await.unwrap();

    let reading = feed.latest().unwrap();
    assert_eq!(reading.fill_level(), Some(92));
    assert_eq!(reading.values.temperature, Some(29.5));
    assert_eq!(feed.len(), 1);

    // The socket is ordered, so the identify frame was seen before the replay.
    let identified = stub.backend.identified.lock().unwrap().clone();
    assert_eq!(
        identified,
        vec![json!({"type": "CONNECT", "token": "tok-1", "username": "alice"})]
    );

    session.logout();
    within(channels.wait_for(|c| c.is_none())).await.unwrap();
    within(state.wait_for(|s| *s == ChannelState::Closed)).await.unwrap();
    assert_eq!(channel.registry().handler_count("data/bin-01/sensors"), 0);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn logout_abandons_stalled_handshake() {
    let stub = common::start(Backend::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let (session, _) = session_at(&dir.path().join("session.json"));
    let supervisor = ChannelSupervisor::spawn(&session, ChannelSettings::new(common::silent_socket().await));
    let flow = flow_for(stub.api_url(), &session);

    flow.login("alice", "secret123").await.unwrap();
    let mut channels = supervisor.watch();
    let stalled = within(channels.wait_for(|c| c.is_some()))
        .await
        .unwrap()
        .clone()
        .unwrap();
    let mut state = stalled.watch_state();
    within(state.wait_for(|s| *s == ChannelState::Connecting)).await.unwrap();

    session.logout();
    within(channels.wait_for(|c| c.is_none())).await.unwrap();
    within(state.wait_for(|s| *s == ChannelState::Closed)).await.unwrap();

    // The supervisor is still listening: a new login gets a new channel.
    flow.login("alice", "secret123").await.unwrap();
    let next = within(channels.wait_for(|c| c.is_some()))
        .await
        .unwrap()
        .clone()
        .unwrap();
    assert!(!Arc::ptr_eq(&stalled, &next));

    supervisor.shutdown().await;
}
