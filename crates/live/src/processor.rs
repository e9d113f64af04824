//! Frame loop for one live connection.
//!
//! Reads inbound frames and dispatches them through the
//! [`TopicRegistry`], while writing queued outbound frames. Handlers run
//! on this task one at a time, each to completion before the next frame
//! is read.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::WsStream;
use crate::messages::parse_inbound;
use crate::registry::TopicRegistry;

/// Why [`run_session`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The owner closed the channel.
    Cancelled,
    /// The server closed the socket or the transport failed.
    Disconnected,
}

/// Drive one connection until it ends.
pub async fn run_session(
    ws_stream: &mut WsStream,
    registry: &TopicRegistry,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    cancel: &CancellationToken,
) -> SessionEnd {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = ws_stream.close(None).await {
                    tracing::debug!(error = %e, "Error sending close frame");
                }
                return SessionEnd::Cancelled;
            }
            Some(json) = outbound.recv() => {
                if let Err(e) = ws_stream.send(Message::Text(json)).await {
                    tracing::error!(error = %e, "Failed to send outbound frame");
                    return SessionEnd::Disconnected;
                }
            }
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_frame(&text, registry);
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::trace!("Ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                        // Handled automatically by tungstenite.
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "Server closed live channel");
                        return SessionEnd::Disconnected;
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Live channel receive error");
                        return SessionEnd::Disconnected;
                    }
                    None => {
                        tracing::info!("Live channel stream exhausted");
                        return SessionEnd::Disconnected;
                    }
                }
            }
        }
    }
}

/// Parse one text frame and fan it out. Malformed frames are logged and
/// dropped.
pub fn handle_text_frame(text: &str, registry: &TopicRegistry) -> usize {
    match parse_inbound(text) {
        Ok(message) => {
            let invoked = registry.dispatch(&message);
            tracing::trace!(topic = %message.topic, invoked, "Dispatched live frame");
            invoked
        }
        Err(e) => {
            tracing::warn!(error = %e, raw_message = %text, "Dropping malformed live frame");
            0
        }
    }
}
