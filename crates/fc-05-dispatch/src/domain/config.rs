//! # Dispatch Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default capacity of each dispatch queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Default number of execution lanes.
pub const DEFAULT_LANES: u32 = 4;

/// Default number of message hashes remembered for deduplication.
pub const DEFAULT_SEEN_CAPACITY: usize = 100_000;

/// Default number of deferred messages held for re-validation.
pub const DEFAULT_DEFERRED_CAPACITY: usize = 10_000;

/// Re-validation schedule for `Deferred` verdicts.
///
/// Delay after the n-th deferral is `base_backoff_ms * 2^(n-1)`, capped at
/// `max_backoff_ms`. After `max_attempts` deferrals the message expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_backoff_ms: 100,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before re-validating a message deferred `attempts` times, or
    /// `None` once the attempts are exhausted.
    #[must_use]
    pub fn next_delay(&self, attempts: u32) -> Option<Duration> {
        if attempts == 0 || attempts >= self.max_attempts {
            return None;
        }
        let factor = 1u64.checked_shl(attempts - 1).unwrap_or(u64::MAX);
        let ms = self
            .base_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Some(Duration::from_millis(ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Capacity of each of the six queues.
    pub queue_capacity: usize,
    /// Number of execution lanes.
    pub lanes: u32,
    pub retry: RetryPolicy,
    pub seen_capacity: usize,
    /// Deferred messages held at once. Intake pauses while this is reached.
    pub deferred_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            lanes: DEFAULT_LANES,
            retry: RetryPolicy::default(),
            seen_capacity: DEFAULT_SEEN_CAPACITY,
            deferred_capacity: DEFAULT_DEFERRED_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.next_delay(6), Some(Duration::from_millis(3_200)));
        assert_eq!(policy.next_delay(7), Some(Duration::from_millis(5_000)));
    }

    #[test]
    fn test_attempts_exhausted() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(8), None);
        assert_eq!(policy.next_delay(0), None);

        let huge = RetryPolicy {
            max_attempts: u32::MAX,
            ..RetryPolicy::default()
        };
        assert_eq!(huge.next_delay(200), Some(Duration::from_millis(5_000)));
    }

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.queue_capacity, 10_000);
        assert_eq!(config.lanes, 4);
        assert_eq!(config.retry.max_attempts, 8);
        assert_eq!(config.deferred_capacity, 10_000);
    }
}
