//! Source of the bearer token attached to authenticated backend calls.

/// Anything that can supply the current bearer token.
///
/// The session store implements this so the REST client always reads the
/// token of the live session instead of holding a stale copy.
pub trait TokenProvider: Send + Sync {
    /// The current access token, or `None` when nobody is logged in.
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, for unauthenticated clients and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl StaticToken {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}
