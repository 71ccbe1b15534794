//! # Core Domain Entities
//!
//! Primitive types shared by every FedChain subsystem.
//!
//! ## Clusters
//!
//! - **Identity**: `Hash`, `ChainId`, `PublicKey`, `Signature`
//! - **Time**: `Timestamp` (millisecond precision, 6 bytes on the wire)
//! - **Network**: `NetworkId`, `NetworkMode`
//! - **Authority**: `ServerRole`, `AuthorityRole`
//! - **Validation**: `Verdict`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::CodecError;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// Compute the SHA-256 digest of `data`.
#[must_use]
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Identifier of a chain on the ledger.
///
/// Servers are identified by their identity chain, so this doubles as the
/// subject of administrative messages.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ChainId(pub [u8; 32]);

impl ChainId {
    /// Build a chain id from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex rendering of the first three bytes, used in summaries.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..3])
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(s).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| CodecError::InvalidHex(format!("expected 32 bytes, got {}", v.len())))?;
        Ok(Self(array))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", self.short())
    }
}

/// Chain id of the administrative chain. Admin messages that do not name a
/// server of their own (block completion) are laned by this id.
pub const ADMIN_CHAIN_ID: ChainId = ChainId::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0x0a,
]);

// =============================================================================
// CLUSTER B: TIME
// =============================================================================

/// Wall-clock timestamp in milliseconds since the Unix epoch.
///
/// Encoded as the low 6 bytes, big-endian, which covers dates until the
/// year 10889.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Number of bytes a timestamp occupies on the wire.
    pub const WIRE_SIZE: usize = 6;

    const MAX_MILLIS: u64 = (1 << 48) - 1;

    /// Current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self::from_millis(millis)
    }

    /// Build from milliseconds, truncated to 48 bits.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis & Self::MAX_MILLIS)
    }

    /// Milliseconds since the epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// 6-byte big-endian encoding.
    #[must_use]
    pub fn to_wire(&self) -> [u8; 6] {
        let full = self.0.to_be_bytes();
        let mut out = [0u8; 6];
        out.copy_from_slice(&full[2..]);
        out
    }

    /// Decode the 6-byte big-endian form.
    #[must_use]
    pub fn from_wire(bytes: [u8; 6]) -> Self {
        let mut full = [0u8; 8];
        full[2..].copy_from_slice(&bytes);
        Self(u64::from_be_bytes(full))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// CLUSTER C: NETWORK
// =============================================================================

/// 32-bit network magic carried in every parcel header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkId(pub u32);

impl NetworkId {
    /// Production network.
    pub const MAIN: NetworkId = NetworkId(0xFEED_BEEF);
    /// Public test network.
    pub const TEST: NetworkId = NetworkId(0xDEAD_BEEF);
    /// Single-machine development network.
    pub const LOCAL: NetworkId = NetworkId(0x00BE_ADED);

    /// Printable name; unknown ids render as `CustomNetwork(0x...)`.
    #[must_use]
    pub fn name(&self) -> String {
        match *self {
            Self::MAIN => "MainNet".to_string(),
            Self::TEST => "TestNet".to_string(),
            Self::LOCAL => "LocalNet".to_string(),
            NetworkId(other) => format!("CustomNetwork({other:#x})"),
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Network the node participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetworkMode {
    /// Production network.
    Main,
    /// Public test network.
    Test,
    /// Single-machine development network.
    #[default]
    Local,
    /// Private network with an explicit network id.
    Custom,
}

impl NetworkMode {
    /// Default network id for this mode. `Custom` has none.
    #[must_use]
    pub fn default_network_id(&self) -> Option<NetworkId> {
        match self {
            Self::Main => Some(NetworkId::MAIN),
            Self::Test => Some(NetworkId::TEST),
            Self::Local => Some(NetworkId::LOCAL),
            Self::Custom => None,
        }
    }
}

impl FromStr for NetworkMode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MAIN" => Ok(Self::Main),
            "TEST" => Ok(Self::Test),
            "LOCAL" => Ok(Self::Local),
            "CUSTOM" => Ok(Self::Custom),
            other => Err(CodecError::UnknownTag {
                field: "network mode",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Main => "MAIN",
            Self::Test => "TEST",
            Self::Local => "LOCAL",
            Self::Custom => "CUSTOM",
        };
        f.write_str(name)
    }
}

// =============================================================================
// CLUSTER D: AUTHORITY
// =============================================================================

/// Role this node plays in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerRole {
    /// Follows the ledger, never leads.
    #[default]
    Client,
    /// Member of the federated set; leads the lanes assigned to it.
    Federated,
    /// Audit server; observes and follows.
    Audit,
}

/// Role of a server inside the authority set, as carried by admin messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum AuthorityRole {
    /// Federated server.
    Federated = 0,
    /// Audit server.
    Audit = 1,
}

impl AuthorityRole {
    /// Wire byte.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for AuthorityRole {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Federated),
            1 => Ok(Self::Audit),
            other => Err(CodecError::UnknownTag {
                field: "authority role",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for AuthorityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Federated => f.write_str("Federated"),
            Self::Audit => f.write_str("Audit"),
        }
    }
}

// =============================================================================
// CLUSTER E: VALIDATION
// =============================================================================

/// Outcome of validating a message against current ledger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum Verdict {
    /// Malformed, unauthorized or stale. Dropped.
    Invalid = -1,
    /// Cannot be judged yet. Re-validated later.
    Deferred = 0,
    /// Eligible for execution.
    Accepted = 1,
}

impl Verdict {
    /// Numeric form: -1, 0 or 1.
    #[must_use]
    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => f.write_str("invalid"),
            Self::Deferred => f.write_str("deferred"),
            Self::Accepted => f.write_str("accepted"),
        }
    }
}
