//! Domain layer: configuration, envelopes, dedup cache, metrics, errors.

pub mod config;
pub mod envelope;
pub mod errors;
pub mod metrics;
pub mod seen;

pub use config::{
    DispatchConfig, RetryPolicy, DEFAULT_DEFERRED_CAPACITY, DEFAULT_LANES,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_SEEN_CAPACITY,
};
pub use envelope::{Envelope, Origin};
pub use errors::{DispatchError, DispatchResult};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use seen::SeenCache;
