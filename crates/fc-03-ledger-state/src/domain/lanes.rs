//! # Lane Assignment
//!
//! Deterministic mapping of a message subject to a processing lane
//! ("VM index"). Same subject, same lane, on every node and across
//! restarts.

use shared_types::{sha256, ChainId};

/// Lane index.
pub type Lane = u32;

/// `sha256(subject)[..8]` as big-endian `u64`, modulo `lanes`.
///
/// A lane count of zero is treated as one.
pub fn compute_lane(subject: &ChainId, lanes: u32) -> Lane {
    let lanes = u64::from(lanes.max(1));
    let hash = sha256(subject.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash[..8]);
    (u64::from_be_bytes(prefix) % lanes) as Lane
}

/// Whether the federated server at `index` of `federated_count` leads `lane`.
pub fn leads_lane(index: usize, federated_count: usize, lane: Lane) -> bool {
    federated_count > 0 && (lane as usize) % federated_count == index
}
