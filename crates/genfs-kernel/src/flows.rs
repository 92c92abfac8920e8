//! Topic-keyed pub/sub for invalidation events.
//!
//! Each topic is a GenFS path. A topic owns its own broadcast channel,
//! created on first subscribe and pruned once every subscriber is gone, so a
//! publish only ever wakes the subscribers of that exact path.
//!
//! # Example
//!
//! ```ignore
//! let bus = TopicBus::new(64);
//! let mut sub = bus.subscribe("bud/app/main.go");
//!
//! bus.publish("bud/app/main.go", Event::Update);
//!
//! let msg = sub.recv().await.unwrap();
//! assert_eq!(msg.event, Event::Update);
//! ```

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::broadcast;

use genfs_types::Event;

/// Default per-topic channel capacity.
pub const DEFAULT_TOPIC_CAPACITY: usize = 64;

/// A message delivered to topic subscribers.
#[derive(Clone, Debug)]
pub struct Notification {
    /// Topic (path) the event was published on.
    pub topic: String,
    /// What happened.
    pub event: Event,
    /// When this message was published.
    pub timestamp: Instant,
}

impl Notification {
    /// Create a new notification.
    pub fn new(topic: impl Into<String>, event: Event) -> Self {
        Self {
            topic: topic.into(),
            event,
            timestamp: Instant::now(),
        }
    }
}

/// Per-topic fan-out bus.
///
/// Publishing never blocks: each topic is a bounded broadcast channel, and a
/// subscriber that falls behind skips the oldest messages (logged) rather
/// than stalling everyone else. No persistence: a subscription only sees
/// events published after it was created.
#[derive(Debug, Clone)]
pub struct TopicBus {
    topics: Arc<DashMap<String, broadcast::Sender<Notification>>>,
    capacity: usize,
}

impl Default for TopicBus {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}

impl TopicBus {
    /// Create a new bus with the given per-topic channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Get the per-topic channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Subscribe to a topic.
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let rx = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        Subscription {
            topic: topic.to_string(),
            rx,
            bus: self.clone(),
        }
    }

    /// Publish an event on a topic.
    ///
    /// Returns the number of subscribers the event was delivered to.
    pub fn publish(&self, topic: &str, event: Event) -> usize {
        let delivered = match self.topics.get(topic) {
            Some(tx) => tx.send(Notification::new(topic, event)).unwrap_or(0),
            None => return 0,
        };
        if delivered == 0 {
            self.prune(topic);
        }
        delivered
    }

    /// Number of live subscriptions on a topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Number of topics with a channel.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Drop a topic's channel if nobody listens anymore.
    fn prune(&self, topic: &str) {
        self.topics.remove_if(topic, |_, tx| tx.receiver_count() == 0);
    }
}

/// A live subscription to one topic.
///
/// Dropping the subscription stops delivery; [`Subscription::release`] does
/// the same and also reclaims the topic's channel when it was the last one.
pub struct Subscription {
    topic: String,
    rx: broadcast::Receiver<Notification>,
    bus: TopicBus,
}

impl Subscription {
    /// Topic this subscription is bound to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receive the next event, waiting if necessary.
    ///
    /// Returns None if the bus is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(topic = %self.topic, lagged = n, "subscription lagged behind");
                }
            }
        }
    }

    /// Try to receive the next event without waiting.
    ///
    /// Returns None if no event is available.
    pub fn try_recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(topic = %self.topic, lagged = n, "subscription lagged behind");
                }
            }
        }
    }

    /// Stop receiving events on this topic.
    pub fn release(self) {
        let Subscription { topic, rx, bus } = self;
        drop(rx);
        bus.prune(&topic);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}
