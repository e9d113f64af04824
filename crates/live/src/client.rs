//! WebSocket client for the backend live endpoint.
//!
//! [`LiveClient`] holds the endpoint URL. [`LiveClient::connect`] performs
//! the handshake and sends the identify frame, returning a stream that is
//! ready to receive topic frames.

use std::time::Duration;

use futures::SinkExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::channel::ChannelState;
use crate::messages::IdentifyFrame;

/// The raw WebSocket stream used by a live connection.
pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Upper bound on the TCP connect plus WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the live endpoint.
#[derive(Debug, Clone)]
pub struct LiveClient {
    ws_url: String,
    handshake_timeout: Duration,
}

impl LiveClient {
    /// `ws_url` is the full endpoint, e.g. `ws://localhost:8080/ws`.
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Open a connection and identify the session.
    pub async fn connect(&self, identity: &IdentifyFrame) -> Result<WsStream, LiveError> {
        let handshake = tokio::time::timeout(self.handshake_timeout, connect_async(self.ws_url.as_str()));
        let (mut ws_stream, _response) = match handshake.await {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                return Err(LiveError::Connection(format!(
                    "Failed to connect to {}: {e}",
                    self.ws_url
                )))
            }
            Err(_) => {
                return Err(LiveError::Connection(format!(
                    "Handshake with {} timed out after {:?}",
                    self.ws_url, self.handshake_timeout
                )))
            }
        };

        let json = serde_json::to_string(identity)
            .map_err(|e| LiveError::Protocol(format!("Failed to encode identify frame: {e}")))?;
        ws_stream
            .send(Message::Text(json))
            .await
            .map_err(|e| LiveError::Protocol(format!("Failed to send identify frame: {e}")))?;

        tracing::info!(
            url = %self.ws_url,
            username = %identity.username,
            "Live channel connected",
        );
        Ok(ws_stream)
    }
}

/// Errors from opening the live channel.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    /// The WebSocket handshake failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The connection was established but a frame could not be exchanged.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// `open` was called on a channel that is not idle.
    #[error("Channel cannot be opened from state {0}")]
    InvalidState(ChannelState),

    /// The channel was closed while the connection was being established.
    #[error("Channel closed while connecting")]
    Cancelled,
}
