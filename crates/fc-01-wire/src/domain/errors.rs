//! # Wire Errors

use fc_04_messages::MessageError;
use shared_types::{CodecError, NetworkId};
use thiserror::Error;

/// Errors from parcel encoding and decoding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParcelError {
    /// A declared length runs past the end of the buffer.
    #[error("Framing error: {0}")]
    Truncated(#[from] CodecError),

    /// The total-length prefix is outside the accepted frame range.
    #[error("Invalid frame length {length} (allowed {min}..={max})")]
    FrameLength { length: usize, min: usize, max: usize },

    /// Header fields disagree with the bytes actually present.
    #[error("Length mismatch in {field}: header says {declared}, found {actual}")]
    LengthMismatch {
        field: &'static str,
        declared: usize,
        actual: usize,
    },

    /// Payload checksum does not match the header.
    #[error("Checksum mismatch: header {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    /// Payload exceeds the protocol ceiling.
    #[error("Payload of {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// Command type not in the known list.
    #[error("Unknown parcel command {0}")]
    UnknownCommand(u16),
}

/// Errors from a peer transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport was closed locally.
    #[error("Transport closed")]
    Closed,

    /// The peer closed the connection.
    #[error("Peer disconnected")]
    Disconnected,

    /// The call deadline elapsed before the operation completed.
    #[error("Deadline elapsed")]
    Timeout,

    /// Underlying stream failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame could not be encoded or decoded.
    #[error("Parcel error: {0}")]
    Parcel(#[from] ParcelError),

    /// Parcel payload is not a valid message.
    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    /// Parcel belongs to a different network.
    #[error("Parcel for network {found}, expected {expected}")]
    WrongNetwork { expected: NetworkId, found: NetworkId },
}

pub type ParcelResult<T> = Result<T, ParcelError>;
pub type TransportResult<T> = Result<T, TransportError>;
