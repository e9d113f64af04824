//! Session state for the BinWatch client.
//!
//! [`SessionStore`] is the single source of truth for who is logged in and
//! which bearer token authorizes backend calls. State changes are published
//! through a `tokio::sync::watch` channel so the live channel and views can
//! react to login/logout. The token and identity are persisted through a
//! [`KeyValueStore`], always written and cleared as a pair.

pub mod storage;
pub mod store;

pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{AuthSession, SessionError, SessionState, SessionStore};
