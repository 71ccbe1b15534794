//! # Signature Errors

use thiserror::Error;

/// Errors that can occur while signing or verifying.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The public key is not a valid curve point.
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Signature verification failed (signature doesn't match message/signer).
    #[error("Signature verification failed")]
    VerificationFailed,

    /// Key file could not be read or written.
    #[error("Key file I/O error: {0}")]
    KeyFileIo(String),

    /// Key file contents are not a 32-byte hex seed.
    #[error("Malformed key file: {0}")]
    MalformedKeyFile(String),
}
