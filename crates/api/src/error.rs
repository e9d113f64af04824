use serde_json::Value;

/// Errors from the REST and AI clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// HTTP 401. On protected endpoints this means the bearer token was
    /// rejected; on `/auth/login` it means bad credentials. `message` is the
    /// server's text, possibly empty.
    #[error("Session expired, please log in again")]
    Unauthorized { message: String },

    /// Any other non-2xx response.
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Message fit for an inline form error or banner.
    ///
    /// Server-provided messages are shown verbatim; everything else falls
    /// back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status { message, .. } | Self::Unauthorized { message } if !message.is_empty() => {
                message.clone()
            }
            _ => fallback.to_string(),
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Looks at `message`, then `detail` (FastAPI), then `error`. Falls back
/// to the raw body when it is short plain text.
pub(crate) fn extract_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "detail", "error"] {
            match map.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(Value::Null) | None => {}
                Some(Value::String(_)) => {}
                Some(other) => return other.to_string(),
            }
        }
        return String::new();
    }
    let trimmed = body.trim();
    if trimmed.len() <= 200 {
        trimmed.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_field_wins() {
        assert_eq!(
            extract_message(r#"{"message":"Bad credentials","error":"Unauthorized"}"#),
            "Bad credentials"
        );
    }

    #[test]
    fn detail_then_error() {
        assert_eq!(extract_message(r#"{"detail":"No bins to collect"}"#), "No bins to collect");
        assert_eq!(extract_message(r#"{"error":"Conflict"}"#), "Conflict");
    }

    #[test]
    fn structured_detail_is_stringified() {
        let msg = extract_message(r#"{"detail":[{"loc":["body"],"msg":"field required"}]}"#);
        assert!(msg.contains("field required"));
    }

    #[test]
    fn plain_text_body() {
        assert_eq!(extract_message("  upstream timeout \n"), "upstream timeout");
        assert_eq!(extract_message(&"x".repeat(500)), "");
    }

    #[test]
    fn user_message_prefers_server_text() {
        let err = ApiError::Status {
            status: 409,
            message: "Username already exists".into(),
        };
        assert_eq!(err.user_message("Registration failed"), "Username already exists");

        let empty = ApiError::Status {
            status: 500,
            message: String::new(),
        };
        assert_eq!(empty.user_message("Registration failed"), "Registration failed");
    }

    #[test]
    fn unauthorized_keeps_server_text() {
        let bad = ApiError::Unauthorized {
            message: "Bad credentials".into(),
        };
        assert!(bad.is_unauthorized());
        assert_eq!(bad.user_message("Login failed"), "Bad credentials");

        let bare = ApiError::Unauthorized { message: String::new() };
        assert_eq!(bare.user_message("Login failed"), "Login failed");
    }
}
