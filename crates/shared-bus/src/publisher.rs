//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::events::{EventFilter, NodeEvent};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Trait for publishing events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event. Returns the number of subscribers that received it.
    async fn publish(&self, event: NodeEvent) -> usize;

    /// Total number of events published.
    fn events_published(&self) -> u64;
}

/// In-process event bus over `tokio::sync::broadcast`.
///
/// Publishing never blocks; a subscriber that falls more than `capacity`
/// events behind skips the oldest ones.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<NodeEvent>,

    /// Active subscription count by topic.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    events_published: AtomicU64,

    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let topic_key = format!("{:?}", filter.topics);
        *self.subscriptions.write().entry(topic_key.clone()).or_insert(0) += 1;

        debug!(topics = ?filter.topics, "New subscription created");

        Subscription::new(receiver, filter, self.subscriptions.clone(), topic_key)
    }

    /// Subscribe and wrap the subscription as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Subscriptions currently open for the given topic key.
    #[must_use]
    pub fn subscriptions_for(&self, filter: &EventFilter) -> usize {
        self.subscriptions
            .read()
            .get(&format!("{:?}", filter.topics))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: NodeEvent) -> usize {
        let topic = event.topic();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(topic = ?topic, receivers, "Event published");
                receivers
            }
            Err(_) => {
                // No subscribers; reporting is optional.
                trace!(topic = ?topic, "Event dropped (no receivers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
