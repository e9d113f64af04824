//! Persistence behaviour of the session store across process restarts.

use std::sync::Arc;

use binwatch_core::auth::{JwtResponse, User};
use binwatch_session::store::{ACCESS_TOKEN_KEY, USER_KEY};
use binwatch_session::{FileStore, KeyValueStore, MemoryStore, SessionStore};

fn jwt(token: &str, username: &str) -> JwtResponse {
    JwtResponse {
        access_token: token.into(),
        token_type: "Bearer".into(),
        username: username.into(),
    }
}

#[test]
fn login_then_restore_reproduces_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = SessionStore::new(Arc::new(FileStore::open(&path).unwrap()));
    first.login(&jwt("tok-1", "alice")).unwrap();
    let before = first.snapshot().auth.unwrap();

    let second = SessionStore::new(Arc::new(FileStore::open(&path).unwrap()));
    second.load_from_storage();
    let after = second.snapshot().auth.unwrap();

    assert_eq!(after, before);
    assert_eq!(after.access_token, "tok-1");
    assert_eq!(after.user.username, "alice");
}

#[test]
fn restore_round_trips_full_identity() {
    let storage = Arc::new(MemoryStore::new());
    let user = User {
        id: "u-42".into(),
        username: "bob".into(),
        email: "bob@example.com".into(),
        first_name: Some("Bob".into()),
        last_name: None,
        is_active: true,
        created_at: chrono::Utc::now(),
    };
    storage.set(ACCESS_TOKEN_KEY, "tok-b").unwrap();
    storage.set(USER_KEY, &serde_json::to_string(&user).unwrap()).unwrap();

    let store = SessionStore::new(storage);
    store.load_from_storage();

    let state = store.snapshot();
    assert_eq!(state.user(), Some(&user));
    assert_eq!(state.access_token(), Some("tok-b"));
}

#[test]
fn corrupt_identity_clears_both_keys() {
    let storage = Arc::new(MemoryStore::new());
    storage.set(ACCESS_TOKEN_KEY, "tok-1").unwrap();
    storage.set(USER_KEY, "{not json").unwrap();

    let store = SessionStore::new(storage.clone());
    store.load_from_storage();

    assert!(!store.is_authenticated());
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
    assert_eq!(storage.get(USER_KEY).unwrap(), None);
}

#[test]
fn token_without_identity_clears_token() {
    let storage = Arc::new(MemoryStore::new());
    storage.set(ACCESS_TOKEN_KEY, "tok-1").unwrap();

    let store = SessionStore::new(storage.clone());
    store.load_from_storage();

    assert!(!store.is_authenticated());
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
}

#[test]
fn identity_without_token_clears_identity() {
    let storage = Arc::new(MemoryStore::new());
    let user = serde_json::to_string(&User::from_login("alice")).unwrap();
    storage.set(USER_KEY, &user).unwrap();

    let store = SessionStore::new(storage.clone());
    store.load_from_storage();

    assert!(!store.is_authenticated());
    assert_eq!(storage.get(USER_KEY).unwrap(), None);
}

#[test]
fn corrupt_storage_file_yields_unauthenticated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "garbage").unwrap();

    let store = SessionStore::new(Arc::new(FileStore::open(&path).unwrap()));
    store.load_from_storage();
    assert!(!store.is_authenticated());
    // Clearing the unreadable session already repaired the file.
    assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "{}");

    // The store still works after self-healing.
    store.login(&jwt("tok-2", "carol")).unwrap();
    let reloaded = SessionStore::new(Arc::new(FileStore::open(&path).unwrap()));
    reloaded.load_from_storage();
    assert!(reloaded.is_authenticated());
}

#[test]
fn logout_clears_state_and_storage() {
    let storage = Arc::new(MemoryStore::new());
    let store = SessionStore::new(storage.clone());
    store.login(&jwt("tok-1", "alice")).unwrap();
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("tok-1"));

    store.logout();

    assert!(!store.is_authenticated());
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
    assert_eq!(storage.get(USER_KEY).unwrap(), None);
}

#[test]
fn logout_when_already_logged_out_is_harmless() {
    let store = SessionStore::new(Arc::new(MemoryStore::new()));
    store.logout();
    store.logout();
    assert!(!store.is_authenticated());
}
