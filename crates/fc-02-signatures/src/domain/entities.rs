//! # Signature Entities
//!
//! The signature block appended to authenticated messages.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use shared_types::{ByteReader, ByteWriter, CodecError, PublicKey, Signature};

/// Public key plus detached signature, as carried on the wire.
///
/// Layout: public key (32 bytes) followed by signature (64 bytes).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBlock {
    /// Key of the signer.
    pub public_key: PublicKey,
    /// Ed25519 signature over the signable encoding.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl SignatureBlock {
    /// Encoded size in bytes.
    pub const WIRE_SIZE: usize = 32 + 64;

    #[must_use]
    pub fn new(public_key: PublicKey, signature: Signature) -> Self {
        Self {
            public_key,
            signature,
        }
    }

    /// Append the wire form to `w`.
    pub fn write(&self, w: &mut ByteWriter) {
        w.put_bytes(&self.public_key).put_bytes(&self.signature);
    }

    /// Read the wire form from `r`.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let public_key = r.array::<32>("signature public key")?;
        let signature = r.array::<64>("signature")?;
        Ok(Self {
            public_key,
            signature,
        })
    }
}

impl std::fmt::Debug for SignatureBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureBlock")
            .field("public_key", &hex::encode(&self.public_key[..8]))
            .field("signature", &hex::encode(&self.signature[..8]))
            .finish()
    }
}
