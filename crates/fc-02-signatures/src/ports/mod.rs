//! # Ports
//!
//! The signer/verifier capability consumed by authenticated messages.

use crate::domain::{SignatureBlock, SignatureError};
use shared_types::PublicKey;

/// Produces signatures with the node's identity key.
pub trait MessageSigner: Send + Sync {
    /// Public half of the signing key.
    fn public_key(&self) -> PublicKey;

    /// Sign `data`, returning a block that carries the public key.
    fn sign(&self, data: &[u8]) -> SignatureBlock;
}

/// Checks signatures produced by any [`MessageSigner`].
pub trait SignatureVerifier: Send + Sync {
    /// Verify `block` over `data`.
    ///
    /// # Errors
    /// * `SignatureError::InvalidPublicKey` - key is not a curve point
    /// * `SignatureError::VerificationFailed` - signature does not match
    fn verify(&self, data: &[u8], block: &SignatureBlock) -> Result<(), SignatureError>;
}
