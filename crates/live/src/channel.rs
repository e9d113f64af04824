//! The session-scoped live channel and its state machine.
//!
//! ```text
//! Idle -> Connecting -> Open -> Closed
//! ```
//!
//! A channel is opened once and never reopened; the owner creates a new
//! [`LiveChannel`] when the authenticated identity changes. With a
//! [`ReconnectConfig`] a dropped connection goes back to `Connecting`
//! instead of `Closed`.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{LiveClient, LiveError, WsStream};
use crate::messages::{IdentifyFrame, InboundMessage, OutboundFrame};
use crate::processor::{run_session, SessionEnd};
use crate::reconnect::{reconnect_loop, ReconnectConfig};
use crate::registry::{Subscription, TopicRegistry};

/// How long [`LiveChannel::shutdown`] waits for the connection task.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        })
    }
}

type OutboundSlot = Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>;

/// One live connection plus the handlers registered against it.
///
/// Dropping the channel closes the connection.
pub struct LiveChannel {
    client: Arc<LiveClient>,
    registry: Arc<TopicRegistry>,
    state: Arc<watch::Sender<ChannelState>>,
    outbound: OutboundSlot,
    reconnect: Option<ReconnectConfig>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveChannel {
    /// Create an idle channel for `ws_url`. No reconnection.
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self::with_client(LiveClient::new(ws_url), None)
    }

    pub fn with_client(client: LiveClient, reconnect: Option<ReconnectConfig>) -> Self {
        let (state, _rx) = watch::channel(ChannelState::Idle);
        Self {
            client: Arc::new(client),
            registry: TopicRegistry::new(),
            state: Arc::new(state),
            outbound: Arc::new(Mutex::new(None)),
            reconnect,
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Enable exponential-backoff reconnection.
    pub fn with_reconnect(mut self, config: ReconnectConfig) -> Self {
        self.reconnect = Some(config);
        self
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// Register a handler for `topic`. See [`TopicRegistry::subscribe`].
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.registry.subscribe(topic, handler)
    }

    /// Connect, identify, and start the frame loop.
    ///
    /// Only valid from `Idle`. A failed handshake leaves the channel
    /// `Closed`.
    pub async fn open(&self, token: &str, username: &str) -> Result<(), LiveError> {
        let began = self.state.send_if_modified(|s| {
            if *s == ChannelState::Idle {
                *s = ChannelState::Connecting;
                true
            } else {
                false
            }
        });
        if !began {
            return Err(LiveError::InvalidState(self.state()));
        }

        let identity = IdentifyFrame {
            token: token.to_string(),
            username: username.to_string(),
        };

        let connected = tokio::select! {
            _ = self.cancel.cancelled() => Err(LiveError::Cancelled),
            result = self.client.connect(&identity) => result,
        };
        let ws_stream = match connected {
            Ok(ws) if !self.cancel.is_cancelled() => ws,
            Ok(_) => {
                self.state.send_replace(ChannelState::Closed);
                return Err(LiveError::Cancelled);
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %self.client.ws_url(), "Live channel failed to open");
                self.state.send_replace(ChannelState::Closed);
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.outbound) = Some(tx);
        if !mark_open(&self.state) {
            // Closed between the handshake and here.
            lock(&self.outbound).take();
            return Err(LiveError::Cancelled);
        }

        let ctx = ConnectionCtx {
            client: Arc::clone(&self.client),
            registry: Arc::clone(&self.registry),
            state: Arc::clone(&self.state),
            outbound: Arc::clone(&self.outbound),
            reconnect: self.reconnect.clone(),
            cancel: self.cancel.clone(),
            identity,
        };
        let handle = tokio::spawn(run_connection(ws_stream, rx, ctx));
        *lock(&self.task) = Some(handle);
        Ok(())
    }

    /// Send a control frame to `destination`.
    ///
    /// Does nothing unless the channel is `Open`. Nothing is queued for
    /// later and no error is reported.
    pub fn send(&self, destination: &str, payload: Value) {
        if !self.is_open() {
            tracing::debug!(destination, state = %self.state(), "Dropping send on non-open channel");
            return;
        }
        let frame = OutboundFrame {
            destination: destination.to_string(),
            payload,
        };
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, destination, "Failed to encode outbound frame");
                return;
            }
        };
        if let Some(tx) = lock(&self.outbound).as_ref() {
            let _ = tx.send(json);
        }
    }

    /// Tear the channel down. Handlers are discarded with it.
    pub fn close(&self) {
        self.cancel.cancel();
        lock(&self.outbound).take();
        self.registry.clear();
        let previous = self.state.send_replace(ChannelState::Closed);
        if previous != ChannelState::Closed {
            tracing::info!(url = %self.client.ws_url(), "Live channel closed");
        }
    }

    /// [`close`](Self::close) and wait for the connection task to finish.
    pub async fn shutdown(&self) {
        self.close();
        let handle = lock(&self.task).take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await;
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for LiveChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveChannel")
            .field("url", &self.client.ws_url())
            .field("state", &self.state())
            .field("registry", &self.registry)
            .finish()
    }
}

/// Everything the connection task needs, detached from the channel.
struct ConnectionCtx {
    client: Arc<LiveClient>,
    registry: Arc<TopicRegistry>,
    state: Arc<watch::Sender<ChannelState>>,
    outbound: OutboundSlot,
    reconnect: Option<ReconnectConfig>,
    cancel: CancellationToken,
    identity: IdentifyFrame,
}

/// Run frame loops until the channel is closed, or the connection drops
/// and reconnection is off or cancelled.
async fn run_connection(
    mut ws_stream: WsStream,
    mut outbound: mpsc::UnboundedReceiver<String>,
    ctx: ConnectionCtx,
) {
    loop {
        let end = run_session(&mut ws_stream, &ctx.registry, &mut outbound, &ctx.cancel).await;
        if end == SessionEnd::Cancelled || ctx.cancel.is_cancelled() {
            break;
        }

        let Some(config) = &ctx.reconnect else {
            tracing::info!("Live channel dropped");
            break;
        };

        ctx.state.send_replace(ChannelState::Connecting);
        // Frames queued for the dead connection are not replayed.
        while outbound.try_recv().is_ok() {}

        match reconnect_loop(&ctx.client, &ctx.identity, config, &ctx.cancel).await {
            Some(ws) => {
                ws_stream = ws;
                if !mark_open(&ctx.state) {
                    break;
                }
            }
            None => break,
        }
    }

    lock(&ctx.outbound).take();
    ctx.state.send_replace(ChannelState::Closed);
}

/// `Connecting -> Open`. Any other state is left alone, so a concurrent
/// `close` is never overwritten.
fn mark_open(state: &watch::Sender<ChannelState>) -> bool {
    state.send_if_modified(|s| {
        if *s == ChannelState::Connecting {
            *s = ChannelState::Open;
            true
        } else {
            false
        }
    })
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
