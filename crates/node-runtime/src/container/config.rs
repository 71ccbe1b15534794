//! # Node Configuration
//!
//! Unified configuration for the node: network, transport, dispatch,
//! storage, identity and the genesis authority set.
//!
//! ## Load order
//!
//! 1. Built-in defaults
//! 2. TOML file named by `FC_CONFIG`, if set
//! 3. Environment overrides: `FC_NETWORK`, `FC_LISTEN_ADDR`, `FC_PEERS`,
//!    `FC_DATA_DIR`
//!
//! [`NodeConfig::validate`] runs before anything is built; a node never
//! starts on a configuration it would reject later.

use fc_01_wire::{TransportConfig, MAX_PAYLOAD};
use fc_03_ledger_state::Authority;
use fc_05_dispatch::DispatchConfig;
use serde::{Deserialize, Serialize};
use shared_types::{AuthorityRole, ChainId, NetworkId, NetworkMode, ServerRole};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const ENV_CONFIG: &str = "FC_CONFIG";
pub const ENV_NETWORK: &str = "FC_NETWORK";
pub const ENV_LISTEN_ADDR: &str = "FC_LISTEN_ADDR";
pub const ENV_PEERS: &str = "FC_PEERS";
pub const ENV_DATA_DIR: &str = "FC_DATA_DIR";

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} in {var}")]
    Env { var: &'static str, value: String },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub transport: TransportSettings,
    pub dispatch: DispatchConfig,
    pub storage: StorageConfig,
    pub identity: IdentityConfig,
    pub block: BlockConfig,
    /// Genesis authority set, used when storage holds none.
    pub authorities: Vec<AuthorityEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub mode: NetworkMode,
    /// Required for `CUSTOM`; overrides the mode's default otherwise.
    pub network_id: Option<u32>,
    pub listen_addr: String,
    /// Peers to dial at startup, as `host:port`.
    pub peers: Vec<String>,
    /// Stamped into outgoing parcels. Zero picks a random id at startup.
    pub node_id: u64,
    /// Delay between attempts to reach an unreachable peer.
    pub redial_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mode: NetworkMode::Local,
            network_id: None,
            listen_addr: "0.0.0.0:8108".to_string(),
            peers: Vec::new(),
            node_id: 0,
            redial_interval_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Largest payload this node will broadcast.
    pub max_payload: usize,
    /// Per-peer outbound buffer, in parcels.
    pub peer_outbox: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            read_timeout_ms: 30_000,
            write_timeout_ms: 10_000,
            max_payload: MAX_PAYLOAD,
            peer_outbox: 1_024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Rocksdb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            backend: StorageBackend::Memory,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Seed file. Defaults to `<data_dir>/node.key`.
    pub key_file: Option<PathBuf>,
    pub role: ServerRole,
    /// Own chain id as hex. When absent it is looked up in the authority
    /// set by public key, then derived from the public key.
    pub chain_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    /// How often a federated node votes to complete the current block.
    /// Zero disables the ticker.
    pub interval_ms: u64,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self { interval_ms: 60_000 }
    }
}

/// One `[[authorities]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityEntry {
    pub chain_id: String,
    pub role: AuthorityRole,
    pub public_key: String,
}

impl AuthorityEntry {
    pub fn to_authority(&self) -> Result<Authority, ConfigError> {
        let chain_id = ChainId::from_hex(&self.chain_id)
            .map_err(|e| invalid("authorities.chain_id", e.to_string()))?;
        let key = hex::decode(&self.public_key)
            .map_err(|e| invalid("authorities.public_key", e.to_string()))?;
        let public_key: [u8; 32] = key.try_into().map_err(|v: Vec<u8>| {
            invalid(
                "authorities.public_key",
                format!("expected 32 bytes, got {}", v.len()),
            )
        })?;
        Ok(Authority::new(chain_id, self.role, public_key))
    }
}

impl NodeConfig {
    /// Defaults, then `FC_CONFIG`, then environment overrides, then
    /// validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(ENV_CONFIG) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_NETWORK) {
            self.network.mode = NetworkMode::from_str(&value).map_err(|_| ConfigError::Env {
                var: ENV_NETWORK,
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(ENV_LISTEN_ADDR) {
            self.network.listen_addr = value;
        }
        if let Some(value) = lookup(ENV_PEERS) {
            self.network.peers = value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = PathBuf::from(value);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network_id()?;
        self.listen_addr()?;
        for peer in &self.network.peers {
            let valid = peer
                .rsplit_once(':')
                .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
            if !valid {
                return Err(invalid("network.peers", format!("{peer:?} is not host:port")));
            }
        }

        let t = &self.transport;
        if t.read_timeout_ms == 0 || t.write_timeout_ms == 0 {
            return Err(invalid("transport", "timeouts must be non-zero"));
        }
        if t.max_payload == 0 || t.max_payload > MAX_PAYLOAD {
            return Err(invalid(
                "transport.max_payload",
                format!("must be within 1..={MAX_PAYLOAD}"),
            ));
        }
        if t.peer_outbox == 0 {
            return Err(invalid("transport.peer_outbox", "must be non-zero"));
        }

        let d = &self.dispatch;
        if d.queue_capacity == 0 {
            return Err(invalid("dispatch.queue_capacity", "must be non-zero"));
        }
        if d.lanes == 0 {
            return Err(invalid("dispatch.lanes", "must be non-zero"));
        }
        if d.retry.max_attempts == 0 {
            return Err(invalid("dispatch.retry.max_attempts", "must be non-zero"));
        }
        if d.seen_capacity == 0 {
            return Err(invalid("dispatch.seen_capacity", "must be non-zero"));
        }
        if d.deferred_capacity == 0 {
            return Err(invalid("dispatch.deferred_capacity", "must be non-zero"));
        }

        if cfg!(not(feature = "rocksdb")) && self.storage.backend == StorageBackend::Rocksdb {
            return Err(invalid(
                "storage.backend",
                "rocksdb backend requires the `rocksdb` feature",
            ));
        }

        if let Some(hex_id) = &self.identity.chain_id {
            ChainId::from_hex(hex_id).map_err(|e| invalid("identity.chain_id", e.to_string()))?;
        }
        self.genesis_authorities()?;
        Ok(())
    }

    /// Network id from the mode, or the explicit override.
    pub fn network_id(&self) -> Result<NetworkId, ConfigError> {
        match (self.network.network_id, self.network.mode.default_network_id()) {
            (Some(id), _) => Ok(NetworkId(id)),
            (None, Some(id)) => Ok(id),
            (None, None) => Err(invalid(
                "network.network_id",
                "CUSTOM networks need an explicit id",
            )),
        }
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.network
            .listen_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| invalid("network.listen_addr", e.to_string()))
    }

    pub fn genesis_authorities(&self) -> Result<Vec<Authority>, ConfigError> {
        self.authorities
            .iter()
            .map(AuthorityEntry::to_authority)
            .collect()
    }

    pub fn key_file(&self) -> PathBuf {
        self.identity
            .key_file
            .clone()
            .unwrap_or_else(|| self.storage.data_dir.join("node.key"))
    }

    /// Per-connection transport settings.
    pub fn transport_config(&self, node_id: u64) -> Result<TransportConfig, ConfigError> {
        Ok(TransportConfig {
            network: self.network_id()?,
            node_id,
            listen_port: self.listen_addr()?.port().to_string(),
            read_timeout: Duration::from_millis(self.transport.read_timeout_ms),
            write_timeout: Duration::from_millis(self.transport.write_timeout_ms),
        })
    }
}
