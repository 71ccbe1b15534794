//! # Consensus Dispatch
//!
//! Moves messages from "received" to "executed": intake, validation,
//! routing by verdict and node role, and execution on the leader or
//! follower path.
//!
//! ## Architecture
//!
//! - `domain` - dispatch config, retry policy, envelopes, dedup cache, metrics
//! - `context` - `NodeContext`, the shared node state handed to consumers
//! - `queues` - the six bounded queues
//! - `consumers` - validation pipeline, invalid sink, lane executors, follower
//! - `dispatcher` - `Dispatcher` (owns queues, spawns consumers) and
//!   `DispatchHandle` (submits messages)
//!
//! ## Message States
//!
//! ```text
//! Received → Validated ─┬─ Invalid  → network_invalid → Dropped
//!                       ├─ Deferred → backoff → Validated (bounded retries)
//!                       └─ Accepted → leader_in / follower_in → Executed
//! ```
//!
//! Every terminal state is published on the event bus.
//!
//! ## Backpressure
//!
//! Queues never drop. A full queue blocks its producer; a full `network_in`
//! stalls the peer read loop feeding it.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod consumers;
pub mod context;
pub mod dispatcher;
pub mod domain;
mod queues;

#[cfg(test)]
mod test_support;

pub use context::NodeContext;
pub use dispatcher::{DispatchHandle, DispatchTasks, Dispatcher};
pub use domain::{
    DispatchConfig, DispatchError, DispatchMetrics, DispatchResult, Envelope, MetricsSnapshot,
    Origin, RetryPolicy,
};
