//! # Dispatch Metrics
//!
//! Lock-free counters updated by the consumers. `snapshot` gives a
//! consistent-enough copy for logs and the reporting layer.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct DispatchMetrics {
    received: AtomicU64,
    duplicates: AtomicU64,
    invalid: AtomicU64,
    deferred: AtomicU64,
    deferred_expired: AtomicU64,
    routed_leader: AtomicU64,
    routed_follower: AtomicU64,
    unrouted: AtomicU64,
    executed_ok: AtomicU64,
    executed_failed: AtomicU64,
    broadcast: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub duplicates: u64,
    pub invalid: u64,
    pub deferred: u64,
    pub deferred_expired: u64,
    pub routed_leader: u64,
    pub routed_follower: u64,
    pub unrouted: u64,
    pub executed_ok: u64,
    pub executed_failed: u64,
    pub broadcast: u64,
}

macro_rules! counters {
    ($($field:ident => $inc:ident),* $(,)?) => {
        impl DispatchMetrics {
            $(
                pub(crate) fn $inc(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )*

            #[must_use]
            pub fn snapshot(&self) -> MetricsSnapshot {
                MetricsSnapshot {
                    $($field: self.$field.load(Ordering::Relaxed),)*
                }
            }
        }
    };
}

counters! {
    received => inc_received,
    duplicates => inc_duplicates,
    invalid => inc_invalid,
    deferred => inc_deferred,
    deferred_expired => inc_deferred_expired,
    routed_leader => inc_routed_leader,
    routed_follower => inc_routed_follower,
    unrouted => inc_unrouted,
    executed_ok => inc_executed_ok,
    executed_failed => inc_executed_failed,
    broadcast => inc_broadcast,
}
