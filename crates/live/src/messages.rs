//! Wire frames exchanged over the live channel.
//!
//! Inbound frames have the shape `{"topic": "...", "message": ..., "timestamp": "..."}`.
//! The first outbound frame identifies the session; later outbound frames
//! are `{"destination": "...", "payload": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A topic-tagged message pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub topic: String,
    /// Opaque payload. Devices sometimes send a JSON document encoded as
    /// a string; see [`payload_object`](Self::payload_object).
    #[serde(default)]
    pub message: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, message: Value) -> Self {
        Self {
            topic: topic.into(),
            message,
            timestamp: None,
        }
    }

    /// The payload as a JSON value, decoding one level of string
    /// encoding if needed.
    pub fn payload_object(&self) -> Value {
        match &self.message {
            Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| self.message.clone()),
            other => other.clone(),
        }
    }
}

/// First frame sent after the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "CONNECT")]
pub struct IdentifyFrame {
    pub token: String,
    pub username: String,
}

/// Control message sent to a server-side destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub destination: String,
    pub payload: Value,
}

/// Parse a raw text frame.
///
/// Fails when the text is not JSON or lacks a string `topic`.
pub fn parse_inbound(text: &str) -> Result<InboundMessage, serde_json::Error> {
    serde_json::from_str(text)
}
