//! # Event Subscriber
//!
//! Defines the subscription side of the event bus.

use crate::events::{EventFilter, NodeEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

/// Trait for subscribing to events from the bus.
pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}

impl EventSubscriber for crate::publisher::InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        crate::publisher::InMemoryEventBus::subscribe(self, filter)
    }
}

/// Decrements the per-topic subscription count when dropped.
struct SubscriptionGuard {
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,
    topic_key: String,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let mut subs = self.subscriptions.write();
        if let Some(count) = subs.get_mut(&self.topic_key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                subs.remove(&self.topic_key);
            }
        }
        debug!(topic = %self.topic_key, "Subscription dropped");
    }
}

/// A subscription handle for receiving events.
pub struct Subscription {
    receiver: broadcast::Receiver<NodeEvent>,
    filter: EventFilter,
    guard: SubscriptionGuard,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<NodeEvent>,
        filter: EventFilter,
        subscriptions: Arc<RwLock<HashMap<String, usize>>>,
        topic_key: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            guard: SubscriptionGuard {
                subscriptions,
                topic_key,
            },
        }
    }

    /// Next matching event, or `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<NodeEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some events dropped");
                    continue;
                }
            };
            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Next matching event if one is buffered.
    pub fn try_recv(&mut self) -> Result<Option<NodeEvent>, SubscriptionError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };
            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

/// A subscription as a `tokio_stream::Stream`.
pub struct EventStream {
    inner: BroadcastStream<NodeEvent>,
    filter: EventFilter,
    _guard: SubscriptionGuard,
}

impl EventStream {
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        let Subscription {
            receiver,
            filter,
            guard,
        } = subscription;
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
            _guard: guard,
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = NodeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                Some(Ok(event)) => {
                    if self.filter.matches(&event) {
                        return Poll::Ready(Some(event));
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(count))) => {
                    debug!(lagged = count, "Stream lagged, some events dropped");
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
