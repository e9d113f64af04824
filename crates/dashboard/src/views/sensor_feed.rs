//! Live readings for one device.

use std::sync::{Arc, Mutex};

use binwatch_api::mqtt::sensor_topic;
use binwatch_core::history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
use binwatch_core::sensor::SensorReading;
use binwatch_live::{InboundMessage, LiveChannel, Subscription};
use chrono::Utc;
use tokio::sync::watch;

use super::lock;

struct FeedState {
    history: HistoryBuffer<SensorReading>,
    dropped: u64,
}

/// Subscribes to `data/{device}/sensors` and keeps the most recent
/// readings, newest first.
///
/// The subscription lives as long as the feed is attached; dropping the
/// feed or calling [`detach`](Self::detach) removes the handler so no
/// stale callback touches the state afterwards.
pub struct SensorFeed {
    device: String,
    state: Arc<Mutex<FeedState>>,
    updates: Arc<watch::Sender<u64>>,
    subscription: Option<Subscription>,
}

impl SensorFeed {
    pub fn new(device: impl Into<String>) -> Self {
        Self::with_capacity(device, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(device: impl Into<String>, capacity: usize) -> Self {
        let (updates, _rx) = watch::channel(0);
        Self {
            device: device.into(),
            state: Arc::new(Mutex::new(FeedState {
                history: HistoryBuffer::new(capacity),
                dropped: 0,
            })),
            updates: Arc::new(updates),
            subscription: None,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn topic(&self) -> String {
        sensor_topic(&self.device)
    }

    /// Register on `channel`, replacing any previous registration.
    pub fn attach(&mut self, channel: &LiveChannel) {
        let state = Arc::clone(&self.state);
        let updates = Arc::clone(&self.updates);
        let subscription = channel.subscribe(self.topic(), move |message| {
            ingest(&state, &updates, message);
        });
        tracing::debug!(topic = %subscription.topic(), "Sensor feed attached");
        self.subscription = Some(subscription);
    }

    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Feed one message through the same path the live handler uses.
    /// Returns whether a reading was recorded.
    pub fn ingest(&self, message: &InboundMessage) -> bool {
        ingest(&self.state, &self.updates, message)
    }

    pub fn latest(&self) -> Option<SensorReading> {
        lock(&self.state).history.latest().cloned()
    }

    /// Readings, newest first.
    pub fn history(&self) -> Vec<SensorReading> {
        lock(&self.state).history.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payloads that could not be turned into a reading.
    pub fn dropped(&self) -> u64 {
        lock(&self.state).dropped
    }

    /// Bumped after every recorded reading.
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }
}

fn ingest(state: &Mutex<FeedState>, updates: &watch::Sender<u64>, message: &InboundMessage) -> bool {
    let payload = message.payload_object();
    match SensorReading::from_payload(&payload, Utc::now()) {
        Ok(reading) => {
            lock(state).history.push(reading);
            updates.send_modify(|n| *n += 1);
            true
        }
        Err(e) => {
            tracing::warn!(topic = %message.topic, error = %e, "Dropping unreadable sensor payload");
            lock(state).dropped += 1;
            false
        }
    }
}
