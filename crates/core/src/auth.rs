//! Authenticated identity and the wire shapes exchanged with the auth endpoints.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// The identity of the logged-in user.
///
/// Persisted as camelCase JSON next to the bearer token, so the field names
/// are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque backend id. Empty when the identity was built from a login
    /// response, which does not carry it.
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl User {
    /// Build the minimal identity record for a freshly logged-in user.
    pub fn from_login(username: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            username: username.into(),
            email: String::new(),
            first_name: None,
            last_name: None,
            is_active: true,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Successful authentication result returned by `/auth/login` and
/// `/auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub username: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Credentials posted to `/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Generic `{ message, success }` acknowledgement used by most mutating
/// backend endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub success: bool,
}
