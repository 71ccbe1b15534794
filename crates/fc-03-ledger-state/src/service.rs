//! # Ledger State Service
//!
//! Owns the ledger height, head references and authority set.
//!
//! ## Single-writer discipline
//!
//! Reads take a shared lock. Every mutation (authority change, height
//! advance) takes the exclusive lock for the whole check-persist-apply
//! sequence, so authority and height transitions are serialized with one
//! another regardless of which lane executes them. Height only moves
//! through [`LedgerState::complete_block`].

use crate::domain::{
    compute_lane, leads_lane, AdminAction, AppliedLog, Authority, AuthoritySet, HeadRecord, Lane,
    LedgerError, LedgerResult, VoteOutcome, VoteTally,
};
use crate::ports::{KeyValueStore, KEY_AUTHORITIES, KEY_HEAD, NS_ADMIN, NS_DIRECTORY_BLOCKS};
use parking_lot::RwLock;
use shared_types::{sha256, AuthorityRole, ChainId, Hash, NetworkId, PublicKey};
use std::sync::Arc;
use tracing::{debug, info};

/// Startup parameters for [`LedgerState::hydrate`].
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Network the genesis record is derived for.
    pub network_id: NetworkId,
    /// Number of execution lanes.
    pub lanes: u32,
    /// Authority set used when storage holds none.
    pub genesis_authorities: Vec<Authority>,
    /// How many applied votes to remember.
    pub applied_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network_id: NetworkId::LOCAL,
            lanes: 4,
            genesis_authorities: Vec::new(),
            applied_capacity: AppliedLog::DEFAULT_CAPACITY,
        }
    }
}

struct LedgerInner {
    head: HeadRecord,
    authorities: AuthoritySet,
    admin_votes: VoteTally,
    block_votes: VoteTally,
    applied: AppliedLog,
}

/// Shared ledger state. Construct once at startup and share by `Arc`.
pub struct LedgerState {
    inner: RwLock<LedgerInner>,
    store: Arc<dyn KeyValueStore>,
    lanes: u32,
}

impl LedgerState {
    /// Load head and authority set from `store`, creating genesis records
    /// when absent.
    pub fn hydrate(store: Arc<dyn KeyValueStore>, config: LedgerConfig) -> LedgerResult<Self> {
        let head = match store.get(NS_DIRECTORY_BLOCKS, KEY_HEAD)? {
            Some(bytes) => {
                let head: HeadRecord = bincode::deserialize(&bytes)?;
                info!(height = head.height, "Loaded ledger head");
                head
            }
            None => {
                let genesis = HeadRecord::genesis(config.network_id.0);
                persist_head(store.as_ref(), &genesis)?;
                info!(
                    network = %config.network_id,
                    head = %hex::encode(genesis.head),
                    "Created genesis head"
                );
                genesis
            }
        };

        let authorities = match store.get(NS_ADMIN, KEY_AUTHORITIES)? {
            Some(bytes) => bincode::deserialize::<AuthoritySet>(&bytes)?,
            None => {
                let seeded = AuthoritySet::new(config.genesis_authorities);
                persist_authorities(store.as_ref(), &seeded)?;
                seeded
            }
        };
        info!(
            servers = authorities.len(),
            federated = authorities.federated_count(),
            "Authority set ready"
        );

        Ok(Self {
            inner: RwLock::new(LedgerInner {
                head,
                authorities,
                admin_votes: VoteTally::default(),
                block_votes: VoteTally::default(),
                applied: AppliedLog::new(config.applied_capacity),
            }),
            store,
            lanes: config.lanes.max(1),
        })
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Height of the block currently being built.
    pub fn height(&self) -> u64 {
        self.inner.read().head.height
    }

    pub fn head(&self) -> HeadRecord {
        self.inner.read().head
    }

    pub fn authorities(&self) -> AuthoritySet {
        self.inner.read().authorities.clone()
    }

    pub fn authority(&self, chain_id: &ChainId) -> Option<Authority> {
        self.inner.read().authorities.get(chain_id).cloned()
    }

    pub fn authority_by_key(&self, public_key: &PublicKey) -> Option<Authority> {
        self.inner.read().authorities.by_key(public_key).cloned()
    }

    pub fn lane_count(&self) -> u32 {
        self.lanes
    }

    /// Lane for `subject` under this ledger's lane count.
    pub fn compute_lane(&self, subject: &ChainId) -> Lane {
        compute_lane(subject, self.lanes)
    }

    /// Whether the federated server `chain_id` leads `lane`.
    pub fn leads_lane(&self, chain_id: &ChainId, lane: Lane) -> bool {
        let inner = self.inner.read();
        let count = inner.authorities.federated_count();
        inner
            .authorities
            .federated_index(chain_id)
            .is_some_and(|index| leads_lane(index, count, lane))
    }

    /// Whether `voter`'s vote carried by `msg_hash` has been applied.
    pub fn is_applied(&self, msg_hash: &Hash, voter: &ChainId) -> bool {
        self.inner.read().applied.contains(msg_hash, voter)
    }

    // =========================================================================
    // EXCLUSIVE MUTATION PATHS
    // =========================================================================

    /// Record `voter`'s vote for an authority-set change carried by the
    /// message `msg_hash`. Applies the change once a federated majority
    /// has voted for the identical action.
    pub fn apply_admin_vote(
        &self,
        msg_hash: Hash,
        voter: &ChainId,
        action: &AdminAction,
    ) -> LedgerResult<VoteOutcome> {
        let mut inner = self.inner.write();
        check_vote(&inner, &msg_hash, voter)?;
        check_action(&inner.authorities, action)?;
        inner.applied.insert(&msg_hash, voter);

        let key = action.digest();
        let votes = inner.admin_votes.record(key, *voter);
        let needed = inner.authorities.majority();
        if votes < needed {
            debug!(subject = %action.subject().short(), votes, needed, "Admin vote recorded");
            return Ok(VoteOutcome::Pending { votes, needed });
        }

        let mut authorities = inner.authorities.clone();
        match action {
            AdminAction::AddServer {
                chain_id,
                role,
                public_key,
            } => {
                authorities.insert(Authority::new(*chain_id, *role, *public_key));
            }
            AdminAction::RemoveServer { chain_id, .. } => {
                authorities.remove(chain_id);
            }
        }
        let mut head = inner.head;
        let mut roll = head.admin_head.to_vec();
        roll.extend_from_slice(&action.encode());
        head.admin_head = sha256(&roll);

        persist_authorities(self.store.as_ref(), &authorities)?;
        persist_head(self.store.as_ref(), &head)?;

        inner.authorities = authorities;
        inner.head = head;
        inner.admin_votes.clear(&key);
        info!(
            subject = %action.subject().short(),
            servers = inner.authorities.len(),
            federated = inner.authorities.federated_count(),
            "Authority set changed"
        );
        Ok(VoteOutcome::Applied)
    }

    /// Record `voter`'s completion vote for `height`. Advances the ledger
    /// by one block once a federated majority agrees.
    pub fn complete_block(
        &self,
        msg_hash: Hash,
        voter: &ChainId,
        height: u64,
    ) -> LedgerResult<VoteOutcome> {
        let mut inner = self.inner.write();
        check_vote(&inner, &msg_hash, voter)?;
        let current = inner.head.height;
        if height != current {
            return Err(LedgerError::StaleHeight {
                current,
                requested: height,
            });
        }
        inner.applied.insert(&msg_hash, voter);

        let key = block_vote_key(height);
        let votes = inner.block_votes.record(key, *voter);
        let needed = inner.authorities.majority();
        if votes < needed {
            debug!(height, votes, needed, "Block completion vote recorded");
            return Ok(VoteOutcome::Pending { votes, needed });
        }

        let next = inner.head.next();
        persist_head(self.store.as_ref(), &next)?;
        inner.head = next;
        inner.block_votes.clear(&key);
        info!(height = next.height, head = %hex::encode(&next.head[..8]), "Ledger height advanced");
        Ok(VoteOutcome::Applied)
    }
}

fn check_vote(inner: &LedgerInner, msg_hash: &Hash, voter: &ChainId) -> LedgerResult<()> {
    if inner.applied.contains(msg_hash, voter) {
        return Err(LedgerError::AlreadyApplied(hex::encode(msg_hash)));
    }
    match inner.authorities.get(voter) {
        Some(a) if a.role == AuthorityRole::Federated => Ok(()),
        _ => Err(LedgerError::NotFederated(voter.short())),
    }
}

fn check_action(authorities: &AuthoritySet, action: &AdminAction) -> LedgerResult<()> {
    match action {
        AdminAction::AddServer {
            chain_id,
            role,
            public_key,
        } => match authorities.get(chain_id) {
            Some(existing) if existing.role == *role && existing.public_key == *public_key => Err(
                LedgerError::AuthorityConflict(format!("{} already present", chain_id.short())),
            ),
            _ => Ok(()),
        },
        AdminAction::RemoveServer { chain_id, role } => match authorities.get(chain_id) {
            Some(existing) if existing.role == *role => Ok(()),
            Some(_) => Err(LedgerError::AuthorityConflict(format!(
                "{} does not hold role {role}",
                chain_id.short()
            ))),
            None => Err(LedgerError::AuthorityConflict(format!(
                "{} not in authority set",
                chain_id.short()
            ))),
        },
    }
}

fn block_vote_key(height: u64) -> Hash {
    let mut input = b"block-complete".to_vec();
    input.extend_from_slice(&height.to_be_bytes());
    sha256(&input)
}

fn persist_head(store: &dyn KeyValueStore, head: &HeadRecord) -> LedgerResult<()> {
    store.put(NS_DIRECTORY_BLOCKS, KEY_HEAD, &bincode::serialize(head)?)?;
    Ok(())
}

fn persist_authorities(store: &dyn KeyValueStore, set: &AuthoritySet) -> LedgerResult<()> {
    store.put(NS_ADMIN, KEY_AUTHORITIES, &bincode::serialize(set)?)?;
    Ok(())
}
