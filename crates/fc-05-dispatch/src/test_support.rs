//! Single-federation fixture: one federated authority with chain id
//! `[1; 32]` signing with seed 1, and a node context around it.

use crate::context::NodeContext;
use crate::dispatcher::Dispatcher;
use crate::domain::DispatchConfig;
use fc_02_signatures::{Ed25519Signer, Ed25519Verifier, MessageSigner};
use fc_03_ledger_state::{Authority, InMemoryStore, LedgerConfig, LedgerState};
use fc_04_messages::Message;
use shared_bus::InMemoryEventBus;
use shared_types::{AuthorityRole, ChainId, NetworkMode, ServerRole};
use std::sync::Arc;

const FEDERATED: ChainId = ChainId::new([1; 32]);

pub(crate) struct Node {
    pub ctx: Arc<NodeContext>,
    pub bus: Arc<InMemoryEventBus>,
    pub chain_id: ChainId,
    federation_signer: Arc<Ed25519Signer>,
}

impl Node {
    pub fn new(role: ServerRole, chain_id: ChainId) -> Self {
        let federation_signer = Arc::new(Ed25519Signer::from_seed([1; 32]));
        let config = LedgerConfig {
            genesis_authorities: vec![Authority::new(
                FEDERATED,
                AuthorityRole::Federated,
                federation_signer.public_key(),
            )],
            ..LedgerConfig::default()
        };
        let ledger = LedgerState::hydrate(Arc::new(InMemoryStore::new()), config).unwrap();
        let bus = Arc::new(InMemoryEventBus::new());
        let ctx = Arc::new(NodeContext {
            ledger: Arc::new(ledger),
            verifier: Arc::new(Ed25519Verifier),
            signer: federation_signer.clone(),
            chain_id,
            role,
            network: NetworkMode::Local,
            events: bus.clone(),
        });
        Self {
            ctx,
            bus,
            chain_id,
            federation_signer,
        }
    }

    pub fn federation_id(&self) -> ChainId {
        FEDERATED
    }

    /// Sign with the federated authority's key.
    pub fn signed(&self, msg: impl Into<Message>) -> Message {
        let mut msg = msg.into();
        msg.sign(self.federation_signer.as_ref()).unwrap();
        msg
    }

    pub fn dispatcher(&self, config: DispatchConfig) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.ctx), config)
    }
}

pub(crate) fn federated_node() -> Node {
    Node::new(ServerRole::Federated, FEDERATED)
}
