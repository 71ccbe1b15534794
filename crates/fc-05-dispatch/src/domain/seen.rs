//! # Seen-Message Cache
//!
//! Bounded record of dedup keys already taken in at intake. A message
//! re-broadcast by several peers is validated and executed once. Keys come
//! from `Message::dedup_key`, which covers the signature.
//!
//! Oldest hashes are evicted first once `capacity` is reached.

use shared_types::Hash;
use std::collections::{HashSet, VecDeque};

pub struct SeenCache {
    set: HashSet<Hash>,
    order: VecDeque<Hash>,
    capacity: usize,
}

impl SeenCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            set: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record `hash`. Returns `false` if it was already present.
    pub fn insert(&mut self, hash: Hash) -> bool {
        if !self.set.insert(hash) {
            return false;
        }
        self.order.push_back(hash);
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.set.remove(&old);
            }
        }
        true
    }

    #[must_use]
    pub fn contains(&self, hash: &Hash) -> bool {
        self.set.contains(hash)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_detected() {
        let mut cache = SeenCache::new(10);
        assert!(cache.insert([1; 32]));
        assert!(!cache.insert([1; 32]));
        assert!(cache.contains(&[1; 32]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_oldest_evicted() {
        let mut cache = SeenCache::new(2);
        cache.insert([1; 32]);
        cache.insert([2; 32]);
        cache.insert([3; 32]);
        assert!(!cache.contains(&[1; 32]));
        assert!(cache.contains(&[2; 32]));
        assert!(cache.contains(&[3; 32]));
        // Evicted hashes are accepted again.
        assert!(cache.insert([1; 32]));
    }
}
