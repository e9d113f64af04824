//! Exponential-backoff reconnection for the live channel.
//!
//! Off by default: a dropped connection simply moves the channel to
//! `Closed`. When a [`ReconnectConfig`] is supplied the channel calls
//! [`reconnect_loop`] instead, retrying with growing delays until a
//! connection succeeds or the [`CancellationToken`] fires.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{LiveClient, WsStream};
use crate::messages::IdentifyFrame;

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Growth factor after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Next delay after `current`, clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Reconnect and re-identify with exponential backoff.
///
/// Returns `None` if `cancel` fires first.
pub async fn reconnect_loop(
    client: &LiveClient,
    identity: &IdentifyFrame,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Option<WsStream> {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        // Wait first: the previous connection just failed.
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
        tracing::info!(
            url = %client.ws_url(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting live channel",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Live channel reconnect cancelled");
                return None;
            }
            result = client.connect(identity) => {
                match result {
                    Ok(ws) => {
                        tracing::info!(attempt, "Live channel reconnected");
                        return Some(ws);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Reconnect attempt {attempt} failed");
                    }
                }
            }
        }

        delay = next_delay(delay, config);
    }
}
