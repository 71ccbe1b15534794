//! # Message Errors

use fc_03_ledger_state::LedgerError;
use shared_types::CodecError;
use thiserror::Error;

/// Errors from encoding, decoding or classifying messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessageError {
    /// Framing or field-level decode failure.
    #[error("Decode error: {0}")]
    Codec(#[from] CodecError),

    /// Buffer is empty; there is no type byte to dispatch on.
    #[error("Empty message buffer")]
    Empty,

    /// The leading type byte is not a known message type.
    #[error("Unknown message type: {0:#04x}")]
    UnknownType(u8),

    /// The leading type byte does not match the variant being decoded.
    #[error("Wrong message type: expected {expected:#04x}, found {found:#04x}")]
    WrongType { expected: u8, found: u8 },

    /// Bytes left over after a complete message.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    /// The message type needs a newer protocol version than negotiated.
    #[error("{command} requires protocol version {required}, negotiated {negotiated}")]
    ProtocolVersion {
        command: &'static str,
        required: u16,
        negotiated: u16,
    },

    /// A reject notice for a block or transaction lacks the hash field.
    #[error("Reject notice for {0} must carry a hash")]
    MissingHash(String),

    /// Behaviour not defined for this message and role.
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// JSON export failed.
    #[error("JSON error: {0}")]
    Json(String),
}

/// Errors surfaced by message execution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// The ledger refused the transition.
    #[error("Ledger rejected execution: {0}")]
    Ledger(#[from] LedgerError),

    /// An authenticated message reached execution without a signature.
    #[error("Message is not signed")]
    Unsigned,

    /// The signing key no longer belongs to an authority.
    #[error("Signer {0} is not in the authority set")]
    UnknownSigner(String),

    /// Execution is not defined for this message and role.
    #[error("Not supported: {0}")]
    Unsupported(String),
}

pub type MessageResult<T> = Result<T, MessageError>;
