//! `/auth` and `/user-profiles` endpoints.

use binwatch_core::auth::{JwtResponse, LoginRequest, MessageResponse, User};
use reqwest::Method;
use serde::Serialize;

use crate::client::ApiClient;
use crate::error::ApiError;

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<JwtResponse, ApiError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.client.send_json(Method::POST, "/auth/login", &body).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse, ApiError> {
        self.client.send_json(Method::POST, "/auth/register", request).await
    }

    /// Invalidate the session server-side. Callers clear local state
    /// regardless of the outcome.
    pub async fn logout(&self) -> Result<MessageResponse, ApiError> {
        self.client
            .send_json(Method::POST, "/auth/logout", &serde_json::json!({}))
            .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<JwtResponse, ApiError> {
        self.client
            .send_json(Method::POST, "/auth/refresh", &RefreshRequest { refresh_token })
            .await
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.client.get_json("/user-profiles/me").await
    }
}
