use binwatch_api::ApiError;
use binwatch_core::error::CoreError;

/// A failure surfaced to the user by a flow or view.
///
/// Every variant renders as a short, user-readable string. Views keep the
/// latest one as a dismissable banner; [`ViewError::SessionExpired`] is
/// instead routed to the navigator, which sends the user back to login.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewError {
    /// Bad credentials or a rejected registration.
    #[error("{0}")]
    AuthFailed(String),

    /// Any protected call answered 401.
    #[error("Your session has expired. Please log in again.")]
    SessionExpired,

    /// A fetch failed; the user may retry manually.
    #[error("{0}")]
    Fetch(String),

    /// Form input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ViewError {
    /// Classify an API error: 401 expires the session, anything else is a
    /// fetch failure carrying the server's message or `fallback`.
    pub fn from_api(err: &ApiError, fallback: &str) -> Self {
        if err.is_unauthorized() {
            ViewError::SessionExpired
        } else {
            ViewError::Fetch(err.user_message(fallback))
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ViewError::SessionExpired)
    }
}

impl From<CoreError> for ViewError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(message) => ViewError::Validation(message),
            other => ViewError::Validation(other.to_string()),
        }
    }
}
