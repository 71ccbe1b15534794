//! # Node Context
//!
//! Everything the dispatcher consumers share: ledger, signing, identity and
//! the event bus. Constructed once at startup and passed around by `Arc`.

use crate::domain::Envelope;
use fc_02_signatures::{MessageSigner, SignatureVerifier};
use fc_03_ledger_state::{Lane, LedgerState};
use fc_04_messages::{RoleContext, ValidationContext};
use shared_bus::EventPublisher;
use shared_types::{ChainId, NetworkMode, ServerRole, Verdict};
use std::sync::Arc;

pub struct NodeContext {
    pub ledger: Arc<LedgerState>,
    pub verifier: Arc<dyn SignatureVerifier>,
    /// Signs messages this node originates.
    pub signer: Arc<dyn MessageSigner>,
    /// This node's identity in the authority set.
    pub chain_id: ChainId,
    pub role: ServerRole,
    pub network: NetworkMode,
    pub events: Arc<dyn EventPublisher>,
}

impl NodeContext {
    /// Role inputs for a message assigned to `lane`, read against the
    /// current authority set.
    pub fn role_for(&self, lane: Lane) -> RoleContext {
        RoleContext {
            role: self.role,
            network: self.network,
            leads_lane: self.ledger.leads_lane(&self.chain_id, lane),
        }
    }

    /// Validate `envelope` against the ledger as it stands now.
    pub fn validate(&self, envelope: &Envelope) -> Verdict {
        let ctx = ValidationContext::new(&self.ledger, self.verifier.as_ref());
        envelope.message.validate(&ctx)
    }
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("chain_id", &self.chain_id)
            .field("role", &self.role)
            .field("network", &self.network)
            .field("height", &self.ledger.height())
            .finish_non_exhaustive()
    }
}
