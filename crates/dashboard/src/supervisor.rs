//! Keeps exactly one live channel per authenticated session.
//!
//! The supervisor follows the session store. When an identity appears (or
//! changes) any previous channel is shut down and a fresh one is created,
//! published, and opened with the session's token. When the session ends
//! the channel is closed and `None` is published. Views watch the published
//! channel and re-register their handlers whenever it changes.

use std::sync::Arc;

use binwatch_live::{LiveChannel, LiveClient, ReconnectConfig};
use binwatch_session::{SessionState, SessionStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::DashboardConfig;

/// How channels are built.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub ws_url: String,
    pub reconnect: Option<ReconnectConfig>,
}

impl ChannelSettings {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            reconnect: None,
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            ws_url: config.ws_url.clone(),
            reconnect: config.reconnect_policy(),
        }
    }
}

type CurrentChannel = Option<Arc<LiveChannel>>;

pub struct ChannelSupervisor {
    current: watch::Receiver<CurrentChannel>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChannelSupervisor {
    pub fn spawn(session: &SessionStore, settings: ChannelSettings) -> Self {
        let (tx, current) = watch::channel(None);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(supervise(session.subscribe(), settings, tx, cancel.clone()));
        Self {
            current,
            cancel,
            task: Some(task),
        }
    }

    /// The channel for the current session, if any.
    pub fn current(&self) -> CurrentChannel {
        self.current.borrow().clone()
    }

    /// Observe channel replacements.
    pub fn watch(&self) -> watch::Receiver<CurrentChannel> {
        self.current.clone()
    }

    /// Close the current channel and stop following the session.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Channel supervisor panicked");
            }
        }
    }
}

impl Drop for ChannelSupervisor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// `(username, token)` the current channel was opened for.
type Identity = (String, String);

fn identity_of(state: &SessionState) -> Option<Identity> {
    state
        .auth
        .as_ref()
        .map(|auth| (auth.user.username.clone(), auth.access_token.clone()))
}

async fn supervise(
    mut sessions: watch::Receiver<SessionState>,
    settings: ChannelSettings,
    tx: watch::Sender<CurrentChannel>,
    cancel: CancellationToken,
) {
    tracing::info!(url = %settings.ws_url, "Channel supervisor started");
    let mut active: Option<Identity> = None;

    'outer: loop {
        let wanted = identity_of(&sessions.borrow_and_update());

        if wanted != active {
            if let Some(previous) = tx.send_replace(None) {
                previous.shutdown().await;
            }
            active = wanted.clone();

            if let Some((username, token)) = wanted {
                let channel = Arc::new(LiveChannel::with_client(
                    LiveClient::new(settings.ws_url.clone()),
                    settings.reconnect.clone(),
                ));
                // Published before opening so handlers are in place for the
                // first frame.
                tx.send_replace(Some(Arc::clone(&channel)));

                // Keep following the session while the handshake runs; a
                // logout or new login abandons it.
                let opening = channel.open(&token, &username);
                tokio::pin!(opening);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break 'outer,
                        result = &mut opening => {
                            match result {
                                Ok(()) => tracing::info!(username = %username, "Live channel opened for session"),
                                Err(e) => tracing::warn!(username = %username, error = %e, "Live channel did not open"),
                            }
                            break;
                        }
                        changed = sessions.changed() => {
                            if changed.is_err() {
                                break 'outer;
                            }
                            if identity_of(&sessions.borrow()) != active {
                                tracing::info!(username = %username, "Session changed while live channel was opening");
                                continue 'outer;
                            }
                        }
                    }
                }
            } else {
                tracing::info!("Session ended; live channel closed");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(channel) = tx.send_replace(None) {
        channel.shutdown().await;
    }
    tracing::info!("Channel supervisor stopped");
}
