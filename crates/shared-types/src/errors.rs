//! # Error Types
//!
//! Errors shared by every crate that reads the binary wire formats.

use thiserror::Error;

/// Errors raised while decoding length-prefixed big-endian buffers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A fixed or length-prefixed field would read past the end of the buffer.
    #[error("Truncated buffer: {field} needs {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// A string field is not valid UTF-8.
    #[error("Invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    /// An enumerated field carries a value with no known meaning.
    #[error("Unknown {field}: {value}")]
    UnknownTag { field: &'static str, value: String },

    /// A hex string could not be parsed.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}
