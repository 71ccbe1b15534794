//! Helpers shared by the authenticated admin variants.

use crate::domain::{
    ExecutionContext, ExecutionError, ExecutionOutcome, ExecutionReport, MessageType,
    ValidationContext,
};
use fc_02_signatures::SignatureBlock;
use fc_03_ledger_state::{Authority, VoteOutcome};
use shared_types::{sha256, AuthorityRole, ByteReader, ChainId, CodecError, Hash, Timestamp, Verdict};
use std::sync::OnceLock;
use tracing::debug;

/// Lazily computed identity hash. Invisible to equality and debug output
/// so decoded and freshly built messages compare equal.
#[derive(Clone, Default)]
pub(crate) struct HashCache(OnceLock<Hash>);

impl HashCache {
    pub(crate) fn get_or_compute(&self, signable: impl FnOnce() -> Vec<u8>) -> Hash {
        *self.0.get_or_init(|| sha256(&signable()))
    }
}

impl PartialEq for HashCache {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for HashCache {}

impl std::fmt::Debug for HashCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.get() {
            Some(h) => write!(f, "{}", hex::encode(&h[..8])),
            None => f.write_str(".."),
        }
    }
}

/// Read a trailing signature block if any bytes remain.
pub(crate) fn read_optional_signature(
    r: &mut ByteReader<'_>,
) -> Result<Option<SignatureBlock>, CodecError> {
    if r.remaining() == 0 {
        Ok(None)
    } else {
        SignatureBlock::read(r).map(Some)
    }
}

/// Signer checks common to admin messages: a signature is present, it was
/// made by a federated authority (optionally a specific one), and it
/// verifies over `signable`.
pub(crate) fn authenticate(
    ctx: &ValidationContext<'_>,
    signable: &[u8],
    signature: Option<&SignatureBlock>,
    expected_signer: Option<&ChainId>,
) -> Verdict {
    let Some(sig) = signature else {
        debug!("Rejecting unsigned admin message");
        return Verdict::Invalid;
    };
    let Some(signer) = ctx.ledger.authority_by_key(&sig.public_key) else {
        debug!(key = %hex::encode(&sig.public_key[..8]), "Signer is not an authority");
        return Verdict::Invalid;
    };
    if signer.role != AuthorityRole::Federated {
        debug!(signer = %signer.chain_id.short(), "Signer is not federated");
        return Verdict::Invalid;
    }
    if expected_signer.is_some_and(|expected| expected != &signer.chain_id) {
        debug!(signer = %signer.chain_id.short(), "Signer does not match claimed server");
        return Verdict::Invalid;
    }
    match ctx.verifier.verify(signable, sig) {
        Ok(()) => Verdict::Accepted,
        Err(e) => {
            debug!(signer = %signer.chain_id.short(), error = %e, "Signature check failed");
            Verdict::Invalid
        }
    }
}

/// Resolve the authority that signed an accepted message.
pub(crate) fn signer_of(
    ctx: &ExecutionContext<'_>,
    signature: Option<&SignatureBlock>,
) -> Result<Authority, ExecutionError> {
    let sig = signature.ok_or(ExecutionError::Unsigned)?;
    ctx.ledger
        .authority_by_key(&sig.public_key)
        .ok_or_else(|| ExecutionError::UnknownSigner(hex::encode(&sig.public_key[..8])))
}

pub(crate) fn report(
    ctx: &ExecutionContext<'_>,
    message_type: MessageType,
    msg_hash: Hash,
    timestamp: Option<Timestamp>,
    outcome: VoteOutcome,
    summary: String,
) -> ExecutionReport {
    ExecutionReport {
        message_type,
        msg_hash,
        timestamp,
        mode: ctx.mode,
        outcome: ExecutionOutcome::from(outcome),
        summary,
    }
}

