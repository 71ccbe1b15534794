//! # Parcel
//!
//! The unit of network transmission: a header describing the frame and a
//! payload that, for `ParcelCommand::Message`, is one encoded message.
//!
//! ## Wire layout (big-endian)
//!
//! | Offset | Field | Size |
//! |--------|-------|------|
//! | 0 | total parcel length (patched after encode) | 4 |
//! | 4 | network id | 4 |
//! | 8 | protocol version | 2 |
//! | 10 | command type | 2 |
//! | 12 | payload length | 4 |
//! | 16 | checksum of payload | 4 |
//! | 20 | node id | 8 |
//! | 28 | target peer | 4 + n |
//! | .. | peer address | 4 + n |
//! | .. | peer port | 4 + n |
//! | .. | payload | 4 + n |

use super::checksum::koopman_crc32;
use super::errors::ParcelError;
use fc_04_messages::PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use shared_types::NetworkId;
use std::fmt;

/// Maximum payload carried by one parcel (512 KiB).
pub const MAX_PAYLOAD: usize = 512 * 1024;

/// Bytes before the first variable-length header field.
pub const PARCEL_FIXED_LEN: usize = 28;

/// Smallest valid frame: fixed header plus four empty length prefixes.
pub const MIN_PARCEL_LEN: usize = PARCEL_FIXED_LEN + 4 * 4;

/// Budget for the three header strings combined.
pub const MAX_HEADER_STRINGS: usize = 4 * 1024;

/// Largest frame a reader will accept.
pub const MAX_PARCEL_LEN: usize = MIN_PARCEL_LEN + MAX_HEADER_STRINGS + MAX_PAYLOAD;

/// Network-level command. Append new commands at the end only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u16)]
pub enum ParcelCommand {
    /// "Still alive."
    Heartbeat = 0,
    Ping = 1,
    Pong = 2,
    /// Ask for peer addresses.
    PeerRequest = 3,
    /// Reply carrying peer addresses.
    PeerResponse = 4,
    /// Network-wide alert.
    Alert = 5,
    /// Application-level message.
    #[default]
    Message = 6,
}

impl ParcelCommand {
    #[must_use]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Heartbeat => "Heartbeat",
            Self::Ping => "Ping",
            Self::Pong => "Pong",
            Self::PeerRequest => "Peer Request",
            Self::PeerResponse => "Peer Response",
            Self::Alert => "Alert",
            Self::Message => "Message",
        }
    }
}

impl TryFrom<u16> for ParcelCommand {
    type Error = ParcelError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Heartbeat,
            1 => Self::Ping,
            2 => Self::Pong,
            3 => Self::PeerRequest,
            4 => Self::PeerResponse,
            5 => Self::Alert,
            6 => Self::Message,
            other => return Err(ParcelError::UnknownCommand(other)),
        })
    }
}

impl fmt::Display for ParcelCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelHeader {
    pub network: NetworkId,
    pub version: u16,
    pub command: ParcelCommand,
    /// Payload length; equals `payload.len()` once the header is updated.
    pub length: u32,
    /// Koopman CRC-32 of the payload.
    pub checksum: u32,
    pub node_id: u64,
    /// Empty for broadcast.
    pub target_peer: String,
    /// Sender address as seen by the receiving connection.
    pub peer_address: String,
    /// Port the sender listens on.
    pub peer_port: String,
}

impl ParcelHeader {
    #[must_use]
    pub fn new(network: NetworkId) -> Self {
        Self {
            network,
            version: PROTOCOL_VERSION,
            command: ParcelCommand::Message,
            length: 0,
            checksum: 0,
            node_id: 0,
            target_peer: String::new(),
            peer_address: String::new(),
            peer_port: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub header: ParcelHeader,
    pub payload: Vec<u8>,
}

impl Parcel {
    /// Application-message parcel with length and checksum filled in.
    #[must_use]
    pub fn new(network: NetworkId, payload: Vec<u8>) -> Self {
        let mut parcel = Self {
            header: ParcelHeader::new(network),
            payload,
        };
        parcel.update_header();
        parcel
    }

    /// Empty-payload liveness parcel.
    #[must_use]
    pub fn heartbeat(network: NetworkId) -> Self {
        Self::new(network, Vec::new()).with_command(ParcelCommand::Heartbeat)
    }

    #[must_use]
    pub fn with_command(mut self, command: ParcelCommand) -> Self {
        self.header.command = command;
        self
    }

    #[must_use]
    pub fn with_node_id(mut self, node_id: u64) -> Self {
        self.header.node_id = node_id;
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.header.peer_port = port.into();
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.header.target_peer = target.into();
        self
    }

    /// Recompute length and checksum from the payload.
    pub fn update_header(&mut self) {
        self.header.length = self.payload.len() as u32;
        self.header.checksum = koopman_crc32(&self.payload);
    }

    /// Printable command, e.g. `[Message]`.
    #[must_use]
    pub fn message_type(&self) -> String {
        format!("[{}]", self.header.command)
    }
}

impl fmt::Display for Parcel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} net={} v{} len={} crc={:#010x} node={}",
            self.message_type(),
            self.header.network,
            self.header.version,
            self.header.length,
            self.header.checksum,
            self.header.node_id
        )?;
        if !self.header.target_peer.is_empty() {
            write!(f, " target={}", self.header.target_peer)?;
        }
        Ok(())
    }
}
