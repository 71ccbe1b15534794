//! # Ed25519 Adapter
//!
//! Deterministic Ed25519 signing (no RNG at sign time).

use crate::domain::{SignatureBlock, SignatureError};
use crate::ports::{MessageSigner, SignatureVerifier};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use shared_types::PublicKey;

/// Node identity key.
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Generate a random key.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// Create from a 32-byte secret seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Secret seed, for persisting to the key file.
    #[must_use]
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl MessageSigner for Ed25519Signer {
    fn public_key(&self) -> PublicKey {
        self.signing_key.verifying_key().to_bytes()
    }

    fn sign(&self, data: &[u8]) -> SignatureBlock {
        let sig = self.signing_key.sign(data);
        SignatureBlock::new(self.public_key(), sig.to_bytes())
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &hex::encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

/// Stateless Ed25519 verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, data: &[u8], block: &SignatureBlock) -> Result<(), SignatureError> {
        let verifying_key = VerifyingKey::from_bytes(&block.public_key)
            .map_err(|_| SignatureError::InvalidPublicKey)?;
        let sig = Signature::from_bytes(&block.signature);
        verifying_key
            .verify(data, &sig)
            .map_err(|_| SignatureError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = Ed25519Signer::generate();
        let block = signer.sign(b"remove server");
        assert_eq!(block.public_key, signer.public_key());
        assert!(Ed25519Verifier.verify(b"remove server", &block).is_ok());
    }

    #[test]
    fn test_tampered_message_fails() {
        let signer = Ed25519Signer::from_seed([7u8; 32]);
        let block = signer.sign(b"height 10");
        assert_eq!(
            Ed25519Verifier.verify(b"height 11", &block),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let signer = Ed25519Signer::from_seed([1u8; 32]);
        let other = Ed25519Signer::from_seed([2u8; 32]);
        let mut block = signer.sign(b"payload");
        block.public_key = other.public_key();
        assert_eq!(
            Ed25519Verifier.verify(b"payload", &block),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = Ed25519Signer::from_seed([9u8; 32]);
        assert_eq!(signer.sign(b"x"), signer.sign(b"x"));

        let restored = Ed25519Signer::from_seed(signer.to_seed());
        assert_eq!(restored.public_key(), signer.public_key());
    }
}
