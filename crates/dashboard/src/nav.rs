//! Screen routing with an authentication guard.

use std::fmt;

use binwatch_session::SessionStore;

use crate::error::ViewError;

/// Every screen the dashboard can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Login,
    Register,
    Dashboard,
    Mqtt,
    SensorData,
    Map,
    AiDashboard,
    RouteOptimizer,
    Users,
}

impl Screen {
    pub const ALL: [Screen; 9] = [
        Screen::Login,
        Screen::Register,
        Screen::Dashboard,
        Screen::Mqtt,
        Screen::SensorData,
        Screen::Map,
        Screen::AiDashboard,
        Screen::RouteOptimizer,
        Screen::Users,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Screen::Login => "/login",
            Screen::Register => "/register",
            Screen::Dashboard => "/dashboard",
            Screen::Mqtt => "/mqtt",
            Screen::SensorData => "/sensor-data",
            Screen::Map => "/map",
            Screen::AiDashboard => "/ai-dashboard",
            Screen::RouteOptimizer => "/route-optimizer",
            Screen::Users => "/users",
        }
    }

    /// Resolve a path. `/` is the dashboard; unknown paths resolve to `None`.
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Some(Screen::Dashboard);
        }
        Self::ALL.into_iter().find(|s| s.path() == trimmed)
    }

    /// Whether the screen requires a logged-in user.
    pub fn is_protected(self) -> bool {
        !matches!(self, Screen::Login | Screen::Register)
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::Login => "Login",
            Screen::Register => "Register",
            Screen::Dashboard => "Dashboard",
            Screen::Mqtt => "MQTT Devices",
            Screen::SensorData => "Sensor Data",
            Screen::Map => "Bin Map",
            Screen::AiDashboard => "AI Predictions",
            Screen::RouteOptimizer => "Route Optimizer",
            Screen::Users => "User Management",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Tracks the current screen and enforces the login guard.
#[derive(Debug, Clone)]
pub struct Navigator {
    session: SessionStore,
    current: Screen,
}

impl Navigator {
    /// Start on the dashboard, or on login when nobody is signed in.
    pub fn new(session: SessionStore) -> Self {
        let mut nav = Self {
            session,
            current: Screen::Login,
        };
        nav.go(Screen::Dashboard);
        nav
    }

    pub fn current(&self) -> Screen {
        self.current
    }

    /// Navigate to `target`, redirecting to login when it is protected and
    /// the session is not authenticated. Returns the screen actually shown.
    pub fn go(&mut self, target: Screen) -> Screen {
        let resolved = self.resolve(target);
        if resolved != target {
            tracing::debug!(requested = %target, "Redirecting unauthenticated user to login");
        }
        self.current = resolved;
        resolved
    }

    /// Navigate by path. Unknown paths go to the dashboard (or login).
    pub fn go_path(&mut self, path: &str) -> Screen {
        self.go(Screen::from_path(path).unwrap_or(Screen::Dashboard))
    }

    /// Screen that would be shown for `target` right now.
    pub fn resolve(&self, target: Screen) -> Screen {
        if target.is_protected() && !self.session.is_authenticated() {
            Screen::Login
        } else {
            target
        }
    }

    /// Re-check the guard after the session changed.
    pub fn revalidate(&mut self) -> Screen {
        self.go(self.current)
    }

    /// React to an error raised by a view. An expired session is logged
    /// out and sent to login; other errors stay on the current screen.
    pub fn handle_error(&mut self, err: &ViewError) -> Screen {
        if err.is_session_expired() {
            tracing::info!(screen = %self.current, "Session expired; returning to login");
            self.session.logout();
            self.current = Screen::Login;
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use binwatch_core::auth::JwtResponse;
    use binwatch_session::MemoryStore;

    use super::*;

    fn session(logged_in: bool) -> SessionStore {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        if logged_in {
            store
                .login(&JwtResponse {
                    access_token: "tok-1".into(),
                    token_type: "Bearer".into(),
                    username: "alice".into(),
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn paths_round_trip() {
        for screen in Screen::ALL {
            assert_eq!(Screen::from_path(screen.path()), Some(screen));
        }
        assert_eq!(Screen::from_path("/"), Some(Screen::Dashboard));
        assert_eq!(Screen::from_path("/map/"), Some(Screen::Map));
        assert_eq!(Screen::from_path("/nowhere"), None);
    }

    #[test]
    fn guard_redirects_when_logged_out() {
        let mut nav = Navigator::new(session(false));
        assert_eq!(nav.current(), Screen::Login);
        assert_eq!(nav.go(Screen::Map), Screen::Login);
        assert_eq!(nav.go(Screen::Register), Screen::Register);
    }

    #[test]
    fn authenticated_user_reaches_protected_screens() {
        let mut nav = Navigator::new(session(true));
        assert_eq!(nav.current(), Screen::Dashboard);
        assert_eq!(nav.go_path("/route-optimizer"), Screen::RouteOptimizer);
    }

    #[test]
    fn expired_session_logs_out_and_redirects() {
        let store = session(true);
        let mut nav = Navigator::new(store.clone());
        nav.go(Screen::Users);

        assert_eq!(nav.handle_error(&ViewError::Fetch("boom".into())), Screen::Users);
        assert!(store.is_authenticated());

        assert_eq!(nav.handle_error(&ViewError::SessionExpired), Screen::Login);
        assert!(!store.is_authenticated());
        assert_eq!(nav.go(Screen::Users), Screen::Login);
    }

    #[test]
    fn revalidate_after_logout() {
        let store = session(true);
        let mut nav = Navigator::new(store.clone());
        nav.go(Screen::Mqtt);
        store.logout();
        assert_eq!(nav.revalidate(), Screen::Login);
    }
}
