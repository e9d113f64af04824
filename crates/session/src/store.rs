//! The observable session store.

use std::sync::Arc;

use binwatch_core::auth::{JwtResponse, User};
use binwatch_core::token::TokenProvider;
use tokio::sync::watch;

use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the raw bearer token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key holding the JSON-encoded [`User`].
pub const USER_KEY: &str = "user";

/// Errors surfaced by session transitions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to persist session: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to encode user: {0}")]
    Encode(#[from] serde_json::Error),
}

/// An authenticated session. Token and identity only exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
}

/// Snapshot of the session published to observers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub auth: Option<AuthSession>,
    /// A login/register request is in flight.
    pub is_loading: bool,
    /// User-readable error from the last attempt.
    pub error: Option<String>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.auth.as_ref().map(|a| &a.user)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.access_token.as_str())
    }
}

/// Process-wide session store.
///
/// Cheap to clone; all clones share the same state and storage. Only the
/// transition methods below write the [`ACCESS_TOKEN_KEY`] and
/// [`USER_KEY`] entries.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<SessionState>>,
    storage: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create an unauthenticated store over `storage`.
    ///
    /// Call [`load_from_storage`](Self::load_from_storage) to restore a
    /// persisted session.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(tx),
            storage,
        }
    }

    /// Current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Restore the persisted session.
    ///
    /// Adopts the stored pair only when both entries exist and the user
    /// parses. Any other combination clears both keys and leaves the store
    /// unauthenticated. Never fails.
    pub fn load_from_storage(&self) {
        let restored = match self.read_persisted() {
            Ok(Persisted::Both(auth)) => Some(auth),
            Ok(Persisted::Neither) => None,
            Ok(Persisted::Inconsistent(reason)) => {
                tracing::warn!(reason = %reason, "Discarding inconsistent persisted session");
                self.clear_storage();
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted session");
                self.clear_storage();
                None
            }
        };

        if let Some(auth) = &restored {
            tracing::info!(username = %auth.user.username, "Restored session from storage");
        }
        self.state.send_modify(|s| s.auth = restored);
    }

    /// Adopt a successful authentication result.
    ///
    /// Persists the token and a minimal identity, then publishes the
    /// authenticated state. If persisting fails both keys are removed and
    /// the previous state is kept.
    pub fn login(&self, response: &JwtResponse) -> Result<(), SessionError> {
        let user = User::from_login(&response.username);
        let encoded = serde_json::to_string(&user)?;

        let written = self
            .storage
            .set(ACCESS_TOKEN_KEY, &response.access_token)
            .and_then(|()| self.storage.set(USER_KEY, &encoded));
        if let Err(e) = written {
            self.clear_storage();
            return Err(e.into());
        }

        tracing::info!(username = %user.username, "Session started");
        let auth = AuthSession {
            user,
            access_token: response.access_token.clone(),
        };
        self.state.send_modify(|s| {
            s.auth = Some(auth);
            s.error = None;
        });
        Ok(())
    }

    /// End the session locally. Storage failures are logged, the state is
    /// always reset.
    pub fn logout(&self) {
        self.clear_storage();
        self.state.send_modify(|s| {
            s.auth = None;
            s.is_loading = false;
            s.error = None;
        });
        tracing::info!("Session cleared");
    }

    /// Reset the transient flags at the start of a login/register attempt.
    pub fn begin_attempt(&self) {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.is_loading != loading;
            s.is_loading = loading;
            changed
        });
    }

    pub fn set_error(&self, error: Option<String>) {
        self.state.send_modify(|s| s.error = error);
    }

    fn read_persisted(&self) -> Result<Persisted, StorageError> {
        let token = non_empty(self.storage.get(ACCESS_TOKEN_KEY)?);
        let user = non_empty(self.storage.get(USER_KEY)?);

        Ok(match (token, user) {
            (None, None) => Persisted::Neither,
            (Some(_), None) => Persisted::Inconsistent("token without user".into()),
            (None, Some(_)) => Persisted::Inconsistent("user without token".into()),
            (Some(access_token), Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Persisted::Both(AuthSession { user, access_token }),
                Err(e) => Persisted::Inconsistent(format!("unparseable user: {e}")),
            },
        })
    }

    fn clear_storage(&self) {
        for key in [ACCESS_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "Failed to clear session key");
            }
        }
    }
}

impl TokenProvider for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.state.borrow().access_token().map(str::to_owned)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SessionStore")
            .field("authenticated", &state.is_authenticated())
            .field("is_loading", &state.is_loading)
            .finish_non_exhaustive()
    }
}

enum Persisted {
    Both(AuthSession),
    Neither,
    Inconsistent(String),
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::storage::MemoryStore;

    /// Storage whose writes always fail.
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("read-only")))
        }
        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.0.remove(key)
        }
    }

    fn jwt(token: &str, username: &str) -> JwtResponse {
        JwtResponse {
            access_token: token.into(),
            token_type: "Bearer".into(),
            username: username.into(),
        }
    }

    #[test]
    fn starts_unauthenticated() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        assert!(!store.is_authenticated());
        assert_eq!(store.bearer_token(), None);
    }

    #[test]
    fn login_sets_state_and_clears_error() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        store.set_error(Some("Login failed".into()));

        store.login(&jwt("tok-1", "alice")).unwrap();

        let state = store.snapshot();
        assert!(state.is_authenticated());
        assert_eq!(state.user().map(|u| u.username.as_str()), Some("alice"));
        assert_eq!(state.access_token(), Some("tok-1"));
        assert_eq!(state.error, None);
        assert_eq!(store.bearer_token().as_deref(), Some("tok-1"));
    }

    #[test]
    fn failed_persist_keeps_previous_state() {
        let store = SessionStore::new(Arc::new(ReadOnlyStore(MemoryStore::new())));
        assert_matches!(store.login(&jwt("tok-1", "alice")), Err(SessionError::Storage(_)));
        assert!(!store.is_authenticated());
    }

    #[test]
    fn begin_attempt_resets_flags() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        store.set_error(Some("boom".into()));
        store.begin_attempt();
        let state = store.snapshot();
        assert!(state.is_loading);
        assert_eq!(state.error, None);
    }

    #[test]
    fn set_loading_only_notifies_on_change() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        let mut rx = store.subscribe();
        rx.mark_unchanged();

        store.set_loading(false);
        assert!(!rx.has_changed().unwrap());

        store.set_loading(true);
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn observers_see_login_and_logout() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        let mut rx = store.subscribe();

        store.login(&jwt("tok-1", "alice")).unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_authenticated());

        store.logout();
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().is_authenticated());
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(ACCESS_TOKEN_KEY, "").unwrap();
        storage.set(USER_KEY, "").unwrap();

        let store = SessionStore::new(storage);
        store.load_from_storage();
        assert!(!store.is_authenticated());
    }
}
