//! # Ledger Records
//!
//! Persisted head record, administrative actions and vote outcomes.

use serde::{Deserialize, Serialize};
use shared_types::{sha256, AuthorityRole, ChainId, Hash, PublicKey};

/// Current ledger head, persisted under `directory_blocks/head`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadRecord {
    /// Height of the block currently being built.
    pub height: u64,
    /// Directory-block head reference.
    pub head: Hash,
    /// Admin-block head reference.
    pub admin_head: Hash,
}

impl HeadRecord {
    /// Genesis record: height 0, head derived from the network id.
    #[must_use]
    pub fn genesis(network_id: u32) -> Self {
        let mut seed = b"fedchain-genesis".to_vec();
        seed.extend_from_slice(&network_id.to_be_bytes());
        let head = sha256(&seed);
        Self {
            height: 0,
            head,
            admin_head: sha256(&head),
        }
    }

    /// Record after completing `self.height`.
    #[must_use]
    pub fn next(&self) -> Self {
        let mut input = self.head.to_vec();
        input.extend_from_slice(&self.height.to_be_bytes());
        Self {
            height: self.height + 1,
            head: sha256(&input),
            admin_head: self.admin_head,
        }
    }
}

/// A change to the authority set, voted on by federated servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminAction {
    AddServer {
        chain_id: ChainId,
        role: AuthorityRole,
        public_key: PublicKey,
    },
    RemoveServer {
        chain_id: ChainId,
        role: AuthorityRole,
    },
}

impl AdminAction {
    /// Subject server of the action.
    #[must_use]
    pub fn subject(&self) -> &ChainId {
        match self {
            Self::AddServer { chain_id, .. } | Self::RemoveServer { chain_id, .. } => chain_id,
        }
    }

    /// Canonical bytes used for the vote key and the admin-head roll.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(66);
        match self {
            Self::AddServer {
                chain_id,
                role,
                public_key,
            } => {
                out.push(0x01);
                out.extend_from_slice(chain_id.as_bytes());
                out.push(role.as_u8());
                out.extend_from_slice(public_key);
            }
            Self::RemoveServer { chain_id, role } => {
                out.push(0x02);
                out.extend_from_slice(chain_id.as_bytes());
                out.push(role.as_u8());
            }
        }
        out
    }

    /// Vote key.
    #[must_use]
    pub fn digest(&self) -> Hash {
        sha256(&self.encode())
    }
}

/// Result of recording a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Vote recorded; majority not yet reached.
    Pending { votes: usize, needed: usize },
    /// Majority reached and the mutation was applied.
    Applied,
}
