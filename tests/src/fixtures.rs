//! Federation fixture shared by the integration flows.
//!
//! Server `i` has chain id `[i + 1; 32]` and signs with seed `[i + 1; 32]`.

use fc_02_signatures::{Ed25519Signer, Ed25519Verifier, MessageSigner};
use fc_03_ledger_state::{Authority, InMemoryStore, LedgerConfig, LedgerState};
use fc_04_messages::Message;
use fc_05_dispatch::NodeContext;
use shared_bus::InMemoryEventBus;
use shared_types::{AuthorityRole, ChainId, NetworkMode, ServerRole};
use std::sync::Arc;

pub struct Federation {
    pub signers: Vec<Arc<Ed25519Signer>>,
}

impl Federation {
    pub fn new(size: u8) -> Self {
        Self {
            signers: (0..size)
                .map(|i| Arc::new(Ed25519Signer::from_seed([i + 1; 32])))
                .collect(),
        }
    }

    pub fn chain_id(&self, index: usize) -> ChainId {
        ChainId::new([index as u8 + 1; 32])
    }

    pub fn authorities(&self) -> Vec<Authority> {
        self.signers
            .iter()
            .enumerate()
            .map(|(i, s)| Authority::new(self.chain_id(i), AuthorityRole::Federated, s.public_key()))
            .collect()
    }

    /// Sign `msg` as federated server `index`.
    pub fn signed(&self, index: usize, msg: impl Into<Message>) -> Message {
        let mut msg = msg.into();
        msg.sign(self.signers[index].as_ref())
            .expect("signing never fails for admin messages");
        msg
    }

    /// A fresh in-memory node that knows this federation. `server` picks
    /// which member the node is; `None` makes it a client.
    pub fn node(&self, server: Option<usize>) -> (Arc<NodeContext>, Arc<InMemoryEventBus>) {
        let ledger = LedgerState::hydrate(
            Arc::new(InMemoryStore::new()),
            LedgerConfig {
                genesis_authorities: self.authorities(),
                ..LedgerConfig::default()
            },
        )
        .expect("in-memory hydrate");

        let (role, chain_id, signer) = match server {
            Some(i) => (ServerRole::Federated, self.chain_id(i), self.signers[i].clone()),
            None => (
                ServerRole::Client,
                ChainId::new([0xCC; 32]),
                Arc::new(Ed25519Signer::from_seed([0xCC; 32])),
            ),
        };

        let bus = Arc::new(InMemoryEventBus::new());
        let ctx = Arc::new(NodeContext {
            ledger: Arc::new(ledger),
            verifier: Arc::new(Ed25519Verifier),
            signer,
            chain_id,
            role,
            network: NetworkMode::Local,
            events: bus.clone(),
        });
        (ctx, bus)
    }
}
