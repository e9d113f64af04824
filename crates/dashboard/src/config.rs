use std::path::PathBuf;
use std::time::Duration;

use binwatch_core::geo::{Location, DEFAULT_CENTER};
use binwatch_live::ReconnectConfig;

use crate::error::ViewError;
use crate::poller::{HISTORY_POLL_INTERVAL, LATEST_POLL_INTERVAL};

/// Dashboard configuration loaded from environment variables.
///
/// All fields have defaults that point at a backend running locally.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// REST API root, including the `/api` prefix.
    pub api_base_url: String,
    /// Live channel endpoint.
    pub ws_url: String,
    /// AI prediction/route service root.
    pub ai_base_url: String,
    /// File holding the persisted session.
    pub storage_path: PathBuf,
    pub request_timeout: Duration,
    pub history_poll_interval: Duration,
    pub latest_poll_interval: Duration,
    /// Reconnect with backoff after the live channel drops (default: off).
    pub reconnect: bool,
    /// Map centre used when no bins are known.
    pub map_center: Location,
}

impl DashboardConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                         | Default                      |
    /// |---------------------------------|------------------------------|
    /// | `BINWATCH_API_URL`              | `http://localhost:8080/api`  |
    /// | `BINWATCH_WS_URL`               | `ws://localhost:8080/ws`     |
    /// | `BINWATCH_AI_URL`               | `http://localhost:8000`      |
    /// | `BINWATCH_STORAGE_PATH`         | `.binwatch/session.json`     |
    /// | `BINWATCH_REQUEST_TIMEOUT_SECS` | `10`                         |
    /// | `BINWATCH_HISTORY_POLL_SECS`    | `10`                         |
    /// | `BINWATCH_LATEST_POLL_SECS`     | `15`                         |
    /// | `BINWATCH_RECONNECT`            | `false`                      |
    /// | `BINWATCH_MAP_CENTER`           | `16.070704,108.220329`       |
    pub fn from_env() -> Result<Self, ViewError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ViewError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let request_timeout = secs(&var, "BINWATCH_REQUEST_TIMEOUT_SECS", 10)?;
        let history_poll_interval = secs(
            &var,
            "BINWATCH_HISTORY_POLL_SECS",
            HISTORY_POLL_INTERVAL.as_secs(),
        )?;
        let latest_poll_interval = secs(
            &var,
            "BINWATCH_LATEST_POLL_SECS",
            LATEST_POLL_INTERVAL.as_secs(),
        )?;

        let reconnect = match var("BINWATCH_RECONNECT", "false").to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => return Err(invalid("BINWATCH_RECONNECT", other, "expected true or false")),
        };

        let map_center = match lookup("BINWATCH_MAP_CENTER").filter(|v| !v.trim().is_empty()) {
            Some(raw) => parse_location(&raw)
                .ok_or_else(|| invalid("BINWATCH_MAP_CENTER", &raw, "expected `lat,lon`"))?,
            None => DEFAULT_CENTER,
        };

        Ok(Self {
            api_base_url: var("BINWATCH_API_URL", "http://localhost:8080/api"),
            ws_url: var("BINWATCH_WS_URL", "ws://localhost:8080/ws"),
            ai_base_url: var("BINWATCH_AI_URL", "http://localhost:8000"),
            storage_path: PathBuf::from(var("BINWATCH_STORAGE_PATH", ".binwatch/session.json")),
            request_timeout,
            history_poll_interval,
            latest_poll_interval,
            reconnect,
            map_center,
        })
    }

    /// Reconnect policy for the live channel, if enabled.
    pub fn reconnect_policy(&self) -> Option<ReconnectConfig> {
        self.reconnect.then(ReconnectConfig::default)
    }
}

fn secs<V>(var: &V, key: &str, default: u64) -> Result<Duration, ViewError>
where
    V: Fn(&str, &str) -> String,
{
    let raw = var(key, &default.to_string());
    match raw.parse::<u64>() {
        Ok(0) => Err(invalid(key, &raw, "must be greater than zero")),
        Ok(n) => Ok(Duration::from_secs(n)),
        Err(_) => Err(invalid(key, &raw, "expected a whole number of seconds")),
    }
}

fn parse_location(raw: &str) -> Option<Location> {
    let (lat, lon) = raw.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon))
        .then(|| Location::new(lat, lon))
}

fn invalid(key: &str, value: &str, reason: &str) -> ViewError {
    ViewError::Config(format!("{key}={value:?}: {reason}"))
}
