//! Topic -> handler registry.
//!
//! Handlers for a topic run in registration order. Matching is on the
//! exact topic string. A topic whose last handler is removed is dropped
//! from the map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::messages::InboundMessage;

/// A registered callback.
pub type Handler = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

type HandlerId = u64;

#[derive(Default)]
struct Inner {
    next_id: HandlerId,
    topics: HashMap<String, Vec<(HandlerId, Handler)>>,
}

/// Registry owned by one [`LiveChannel`](crate::LiveChannel).
#[derive(Default)]
pub struct TopicRegistry {
    inner: Mutex<Inner>,
}

impl TopicRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `handler` for `topic`.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// dropped or [`unsubscribe`](Subscription::unsubscribe)d.
    pub fn subscribe<F>(self: &Arc<Self>, topic: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .topics
            .entry(topic.clone())
            .or_default()
            .push((id, Arc::new(handler)));
        drop(inner);

        tracing::debug!(topic = %topic, handler_id = id, "Handler subscribed");
        Subscription {
            registry: Arc::downgrade(self),
            topic,
            id,
            active: true,
        }
    }

    /// Invoke every handler registered for `message.topic`.
    ///
    /// Handlers are snapshotted before the first call, so a handler may
    /// subscribe or unsubscribe without deadlocking. Returns the number of
    /// handlers invoked.
    pub fn dispatch(&self, message: &InboundMessage) -> usize {
        let handlers: Vec<Handler> = match self.lock().topics.get(&message.topic) {
            Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return 0,
        };
        for handler in &handlers {
            handler(message);
        }
        handlers.len()
    }

    pub fn handler_count(&self, topic: &str) -> usize {
        self.lock().topics.get(topic).map_or(0, Vec::len)
    }

    /// Topics with at least one handler.
    pub fn topics(&self) -> Vec<String> {
        self.lock().topics.keys().cloned().collect()
    }

    /// Drop every handler.
    pub fn clear(&self) {
        self.lock().topics.clear();
    }

    fn remove(&self, topic: &str, id: HandlerId) {
        let mut inner = self.lock();
        if let Some(list) = inner.topics.get_mut(topic) {
            list.retain(|(hid, _)| *hid != id);
            if list.is_empty() {
                inner.topics.remove(topic);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for TopicRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        let mut map = f.debug_map();
        for (topic, handlers) in &inner.topics {
            map.entry(topic, &handlers.len());
        }
        map.finish()
    }
}

/// Handle to a registered handler. Dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes its handler"]
pub struct Subscription {
    registry: Weak<TopicRegistry>,
    topic: String,
    id: HandlerId,
    active: bool,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Remove the handler now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        // The registry may already be gone with its channel.
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.topic, self.id);
            tracing::debug!(topic = %self.topic, handler_id = self.id, "Handler unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
