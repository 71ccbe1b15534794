//! Fixtures for variant tests: a federation of deterministic signers and a
//! ledger that recognises them.

use crate::contract::MessageVariant;
use crate::domain::ValidationContext;
use fc_02_signatures::{Ed25519Signer, Ed25519Verifier, MessageSigner};
use fc_03_ledger_state::{Authority, InMemoryStore, LedgerConfig, LedgerState};
use shared_types::{AuthorityRole, ChainId, PublicKey, Verdict};
use std::sync::Arc;

pub(crate) fn signer(seed: u8) -> Ed25519Signer {
    Ed25519Signer::from_seed([seed; 32])
}

pub(crate) struct Federation {
    pub ledger: LedgerState,
    pub signers: Vec<Ed25519Signer>,
}

impl Federation {
    /// `n` federated servers; server `i` has chain id `[i + 1; 32]` and
    /// signs with seed `i + 1`.
    pub fn new(n: u8) -> Self {
        let signers: Vec<Ed25519Signer> = (1..=n).map(signer).collect();
        let authorities = signers
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Authority::new(
                    ChainId::new([i as u8 + 1; 32]),
                    AuthorityRole::Federated,
                    s.public_key(),
                )
            })
            .collect();
        let config = LedgerConfig {
            genesis_authorities: authorities,
            ..LedgerConfig::default()
        };
        let ledger = LedgerState::hydrate(Arc::new(InMemoryStore::new()), config)
            .expect("in-memory hydrate");
        Self { ledger, signers }
    }

    pub fn chain_id(&self, index: u8) -> ChainId {
        ChainId::new([index + 1; 32])
    }

    pub fn public_key(&self, index: usize) -> PublicKey {
        self.signers[index].public_key()
    }
}

pub(crate) fn single_federation() -> Federation {
    Federation::new(1)
}

pub(crate) fn validate<M: MessageVariant>(ledger: &LedgerState, msg: &M) -> Verdict {
    msg.validate(&ValidationContext::new(ledger, &Ed25519Verifier))
}
