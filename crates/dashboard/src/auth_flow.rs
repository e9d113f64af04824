//! Login, logout and registration flows.
//!
//! The flows own the transient `is_loading`/`error` flags on the session
//! store; the store itself only ever sees a successful [`JwtResponse`].

use std::sync::Arc;

use async_trait::async_trait;
use binwatch_api::auth::RegisterRequest;
use binwatch_api::{ApiClient, ApiError};
use binwatch_core::auth::{JwtResponse, MessageResponse};
use binwatch_core::validation::{validate_registration, RegistrationForm};
use binwatch_session::SessionStore;

use crate::error::ViewError;

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";

/// The backend calls the auth flows depend on.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<JwtResponse, ApiError>;
    async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse, ApiError>;
    async fn logout(&self) -> Result<MessageResponse, ApiError>;
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<JwtResponse, ApiError> {
        self.auth().login(username, password).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse, ApiError> {
        self.auth().register(request).await
    }

    async fn logout(&self) -> Result<MessageResponse, ApiError> {
        self.auth().logout().await
    }
}

#[derive(Clone)]
pub struct AuthFlow {
    backend: Arc<dyn AuthBackend>,
    session: SessionStore,
}

impl AuthFlow {
    pub fn new(backend: Arc<dyn AuthBackend>, session: SessionStore) -> Self {
        Self { backend, session }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Authenticate and start a session.
    ///
    /// On failure the error is published on the store and returned; the
    /// previous session, if any, is left as it was. Loading is reset on
    /// every path.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ViewError> {
        self.session.begin_attempt();
        let result = self.try_login(username, password).await;
        if let Err(e) = &result {
            tracing::warn!(username, error = %e, "Login failed");
            self.session.set_error(Some(e.to_string()));
        }
        self.session.set_loading(false);
        result
    }

    async fn try_login(&self, username: &str, password: &str) -> Result<(), ViewError> {
        let response = self
            .backend
            .login(username, password)
            .await
            .map_err(|e| ViewError::AuthFailed(e.user_message(LOGIN_FAILED)))?;
        self.session.login(&response).map_err(|e| {
            tracing::error!(error = %e, "Failed to persist session");
            ViewError::AuthFailed(LOGIN_FAILED.to_string())
        })
    }

    /// Validate the form, create the account, then log in with it.
    ///
    /// Validation failures never reach the network.
    pub async fn register(&self, form: &RegistrationForm) -> Result<(), ViewError> {
        if let Err(e) = validate_registration(form) {
            let err = ViewError::from(e);
            self.session.set_error(Some(err.to_string()));
            return Err(err);
        }

        self.session.begin_attempt();
        let request = RegisterRequest {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password.clone(),
            first_name: None,
            last_name: None,
        };
        if let Err(e) = self.backend.register(&request).await {
            let err = ViewError::AuthFailed(e.user_message(REGISTRATION_FAILED));
            tracing::warn!(username = %request.username, error = %err, "Registration failed");
            self.session.set_error(Some(err.to_string()));
            self.session.set_loading(false);
            return Err(err);
        }
        tracing::info!(username = %request.username, "Account registered");

        self.login(&request.username, &form.password).await
    }

    /// End the session. The server call is best effort; local state is
    /// always cleared.
    pub async fn logout(&self) {
        if let Err(e) = self.backend.logout().await {
            tracing::warn!(error = %e, "Server-side logout failed; clearing local session anyway");
        }
        self.session.logout();
    }
}
