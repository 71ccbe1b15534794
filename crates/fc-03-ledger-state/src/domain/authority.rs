//! # Authority Set
//!
//! Servers recognised by the ledger, keyed by identity chain id.
//! Federated servers vote on admin actions and lead execution lanes.

use serde::{Deserialize, Serialize};
use shared_types::{AuthorityRole, ChainId, PublicKey};
use std::collections::BTreeMap;

/// A server in the authority set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub chain_id: ChainId,
    pub role: AuthorityRole,
    /// Key the server signs admin messages with.
    pub public_key: PublicKey,
}

impl Authority {
    #[must_use]
    pub fn new(chain_id: ChainId, role: AuthorityRole, public_key: PublicKey) -> Self {
        Self {
            chain_id,
            role,
            public_key,
        }
    }
}

/// Ordered authority set. Ordering by chain id fixes the federated index
/// used for lane leadership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritySet {
    servers: BTreeMap<ChainId, Authority>,
}

impl AuthoritySet {
    #[must_use]
    pub fn new(servers: impl IntoIterator<Item = Authority>) -> Self {
        Self {
            servers: servers.into_iter().map(|a| (a.chain_id, a)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn get(&self, chain_id: &ChainId) -> Option<&Authority> {
        self.servers.get(chain_id)
    }

    pub fn contains(&self, chain_id: &ChainId) -> bool {
        self.servers.contains_key(chain_id)
    }

    /// Find the authority signing with `public_key`.
    pub fn by_key(&self, public_key: &PublicKey) -> Option<&Authority> {
        self.servers.values().find(|a| &a.public_key == public_key)
    }

    /// Insert or replace a server. Returns the previous entry.
    pub fn insert(&mut self, authority: Authority) -> Option<Authority> {
        self.servers.insert(authority.chain_id, authority)
    }

    pub fn remove(&mut self, chain_id: &ChainId) -> Option<Authority> {
        self.servers.remove(chain_id)
    }

    /// Federated servers in chain-id order.
    pub fn federated(&self) -> impl Iterator<Item = &Authority> {
        self.servers
            .values()
            .filter(|a| a.role == AuthorityRole::Federated)
    }

    pub fn federated_count(&self) -> usize {
        self.federated().count()
    }

    /// Position of `chain_id` among federated servers.
    pub fn federated_index(&self, chain_id: &ChainId) -> Option<usize> {
        self.federated().position(|a| &a.chain_id == chain_id)
    }

    /// Votes required for a federated majority: `n / 2 + 1`.
    pub fn majority(&self) -> usize {
        self.federated_count() / 2 + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &Authority> {
        self.servers.values()
    }
}
