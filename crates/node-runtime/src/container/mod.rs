//! # Node Container
//!
//! Builds the long-lived node state in dependency order:
//!
//! 1. Storage backend
//! 2. Identity key and chain id
//! 3. Ledger, hydrated from storage or genesis
//! 4. Event bus and [`NodeContext`]

pub mod config;

pub use config::{ConfigError, NodeConfig};

use crate::adapters::storage::open_store;
use anyhow::{Context, Result};
use fc_02_signatures::{load_or_create_key, Ed25519Signer, Ed25519Verifier, MessageSigner};
use fc_03_ledger_state::{Authority, LedgerConfig, LedgerState};
use fc_05_dispatch::NodeContext;
use shared_bus::InMemoryEventBus;
use shared_types::{sha256, AuthorityRole, ChainId, NetworkMode, ServerRole};
use std::sync::Arc;
use tracing::info;

/// Everything built from configuration before any task is spawned.
pub struct NodeContainer {
    pub config: NodeConfig,
    pub ctx: Arc<NodeContext>,
    pub bus: Arc<InMemoryEventBus>,
    /// Stamped into outgoing parcel headers.
    pub node_id: u64,
}

impl NodeContainer {
    /// Build from a validated configuration.
    pub fn build(config: NodeConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let network_id = config.network_id()?;

        let store = open_store(&config.storage).context("Failed to open ledger storage")?;

        let key_path = config.key_file();
        let signer = Arc::new(
            load_or_create_key(&key_path)
                .with_context(|| format!("Failed to load identity key {}", key_path.display()))?,
        );

        let mut genesis = config.genesis_authorities()?;
        let chain_id = resolve_chain_id(&config, &signer, &genesis)?;
        if genesis.is_empty()
            && config.network.mode == NetworkMode::Local
            && config.identity.role == ServerRole::Federated
        {
            info!(chain_id = %chain_id.short(), "No authorities configured; seeding self as sole federated server");
            genesis.push(Authority::new(
                chain_id,
                AuthorityRole::Federated,
                signer.public_key(),
            ));
        }

        let ledger = LedgerState::hydrate(
            store,
            LedgerConfig {
                network_id,
                lanes: config.dispatch.lanes,
                genesis_authorities: genesis,
                ..LedgerConfig::default()
            },
        )
        .context("Failed to hydrate ledger")?;

        let node_id = match config.network.node_id {
            0 => rand::random(),
            id => id,
        };

        let bus = Arc::new(InMemoryEventBus::new());
        let ctx = Arc::new(NodeContext {
            ledger: Arc::new(ledger),
            verifier: Arc::new(Ed25519Verifier),
            signer,
            chain_id,
            role: config.identity.role,
            network: config.network.mode,
            events: bus.clone(),
        });
        info!(
            network = %network_id,
            role = ?ctx.role,
            chain_id = %chain_id.short(),
            node_id,
            height = ctx.ledger.height(),
            "Node state ready"
        );

        Ok(Self {
            config,
            ctx,
            bus,
            node_id,
        })
    }
}

/// Explicit id, else our entry in the genesis set, else derived from the
/// public key.
fn resolve_chain_id(
    config: &NodeConfig,
    signer: &Ed25519Signer,
    genesis: &[Authority],
) -> Result<ChainId> {
    if let Some(hex_id) = &config.identity.chain_id {
        return ChainId::from_hex(hex_id).context("Invalid identity.chain_id");
    }
    let public_key = signer.public_key();
    Ok(genesis
        .iter()
        .find(|a| a.public_key == public_key)
        .map(|a| a.chain_id)
        .unwrap_or_else(|| ChainId::new(sha256(&public_key))))
}
