//! # Shared Bus - Node Event Bus
//!
//! Carries [`NodeEvent`]s from the dispatcher and runtime to whoever reports
//! on them. Publishing is fire-and-forget: a node with no subscribers runs
//! exactly the same.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe()  ┌──────────────┐
//! │  Dispatcher  │ ────────────► │  Event Bus   │ ────────────► │  Reporter    │
//! │  Runtime     │               │  (broadcast) │               │  Tests       │
//! └──────────────┘               └──────────────┘               └──────────────┘
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, MessageRecord, NodeEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Events buffered per subscriber before the oldest are skipped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(InMemoryEventBus::new().capacity(), DEFAULT_CHANNEL_CAPACITY);
    }
}
