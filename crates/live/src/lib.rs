//! Live-data subscription channel.
//!
//! One WebSocket connection per authenticated session. The server pushes
//! `{topic, message, timestamp}` frames which are fanned out to the
//! handlers registered for that exact topic, in registration order.
//! Outbound `{destination, payload}` frames are sent only while the
//! connection is open.

pub mod channel;
pub mod client;
pub mod messages;
pub mod processor;
pub mod reconnect;
pub mod registry;

pub use channel::{ChannelState, LiveChannel};
pub use client::{LiveClient, LiveError};
pub use messages::{IdentifyFrame, InboundMessage, OutboundFrame};
pub use reconnect::ReconnectConfig;
pub use registry::{Subscription, TopicRegistry};
