//! # Message Types and Codes

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::MessageError;

/// Protocol version this node speaks.
pub const PROTOCOL_VERSION: u16 = 2;

/// First protocol version that carries reject notices.
pub const REJECT_MIN_VERSION: u16 = 2;

/// Command names that reject notices may reference with a hash.
pub const CMD_BLOCK: &str = "block";
pub const CMD_TX: &str = "tx";

/// Leading type byte of every encoded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Block completion vote.
    EndOfBlock = 0x00,
    /// Reject notice for a previously received message.
    Reject = 0x10,
    /// Request to add a server to the authority set.
    AddServer = 0x16,
    /// Request to remove a server from the authority set.
    RemoveServer = 0x17,
}

impl MessageType {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Command tag used in logs, reports and reject notices.
    #[must_use]
    pub fn command(self) -> &'static str {
        match self {
            Self::EndOfBlock => "endofblock",
            Self::Reject => "reject",
            Self::AddServer => "addserver",
            Self::RemoveServer => "removeserver",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = MessageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::EndOfBlock),
            0x10 => Ok(Self::Reject),
            0x16 => Ok(Self::AddServer),
            0x17 => Ok(Self::RemoveServer),
            other => Err(MessageError::UnknownType(other)),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Reason code carried by a reject notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RejectCode(pub u8);

impl RejectCode {
    pub const MALFORMED: RejectCode = RejectCode(0x01);
    pub const INVALID: RejectCode = RejectCode(0x10);
    pub const OBSOLETE: RejectCode = RejectCode(0x11);
    pub const DUPLICATE: RejectCode = RejectCode(0x12);
    pub const NONSTANDARD: RejectCode = RejectCode(0x40);
    pub const DUST: RejectCode = RejectCode(0x41);
    pub const INSUFFICIENT_FEE: RejectCode = RejectCode(0x42);
    pub const CHECKPOINT: RejectCode = RejectCode(0x43);
}

impl fmt::Display for RejectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::MALFORMED => "REJECT_MALFORMED",
            Self::INVALID => "REJECT_INVALID",
            Self::OBSOLETE => "REJECT_OBSOLETE",
            Self::DUPLICATE => "REJECT_DUPLICATE",
            Self::NONSTANDARD => "REJECT_NONSTANDARD",
            Self::DUST => "REJECT_DUST",
            Self::INSUFFICIENT_FEE => "REJECT_INSUFFICIENTFEE",
            Self::CHECKPOINT => "REJECT_CHECKPOINT",
            RejectCode(other) => return write!(f, "Unknown RejectCode ({other})"),
        };
        f.write_str(name)
    }
}
