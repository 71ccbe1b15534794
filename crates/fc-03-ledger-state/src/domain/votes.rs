//! # Vote Tally
//!
//! Counts distinct federated voters per proposal key.

use shared_types::{sha256, ChainId, Hash};
use std::collections::{HashMap, HashSet, VecDeque};

/// Votes keyed by proposal (admin-action digest or block-completion key).
#[derive(Debug, Default)]
pub struct VoteTally {
    votes: HashMap<Hash, HashSet<ChainId>>,
}

impl VoteTally {
    /// Record `voter` for `key`, returning the distinct voter count.
    pub fn record(&mut self, key: Hash, voter: ChainId) -> usize {
        let voters = self.votes.entry(key).or_default();
        voters.insert(voter);
        voters.len()
    }

    /// Drop the tally for `key`.
    pub fn clear(&mut self, key: &Hash) {
        self.votes.remove(key);
    }

    pub fn count(&self, key: &Hash) -> usize {
        self.votes.get(key).map_or(0, HashSet::len)
    }
}

/// Bounded FIFO set of applied votes. A vote is a message hash paired with
/// the federated server that signed it; `msg_hash` leaves the signature
/// out, so two servers signing an identical body share the hash.
#[derive(Debug)]
pub struct AppliedLog {
    seen: HashSet<Hash>,
    order: VecDeque<Hash>,
    capacity: usize,
}

impl AppliedLog {
    pub const DEFAULT_CAPACITY: usize = 100_000;

    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert the vote; false if it was already present.
    pub fn insert(&mut self, msg_hash: &Hash, voter: &ChainId) -> bool {
        let key = vote_key(msg_hash, voter);
        if !self.seen.insert(key) {
            return false;
        }
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub fn contains(&self, msg_hash: &Hash, voter: &ChainId) -> bool {
        self.seen.contains(&vote_key(msg_hash, voter))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

fn vote_key(msg_hash: &Hash, voter: &ChainId) -> Hash {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(msg_hash);
    buf[32..].copy_from_slice(voter.as_bytes());
    sha256(&buf)
}

impl Default for AppliedLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
