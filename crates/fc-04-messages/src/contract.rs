//! # Message Variant Contract
//!
//! The capability set every message type implements. Concrete variants
//! live in [`crate::variants`]; [`crate::Message`] is the closed set the
//! node dispatches on.
//!
//! ## Identity hash
//!
//! `msg_hash` is SHA-256 of the signable encoding (all fields except the
//! signature), computed on first call and cached. Re-signing never changes
//! it.

use crate::domain::{
    ExecutionContext, ExecutionError, ExecutionReport, MessageError, MessageResult, MessageType,
    RoleContext, ValidationContext,
};
use fc_02_signatures::MessageSigner;
use serde::Serialize;
use shared_types::{ChainId, Hash, Timestamp, Verdict};

pub trait MessageVariant: Send + Sync {
    /// Type byte this variant encodes with.
    const TYPE: MessageType;

    /// Routing tag.
    fn command(&self) -> &'static str {
        Self::TYPE.command()
    }

    /// Canonical encoding at the current protocol version.
    fn marshal_binary(&self) -> MessageResult<Vec<u8>>;

    /// Decode from `data` under the negotiated protocol `version`,
    /// returning the unconsumed remainder.
    ///
    /// # Errors
    /// * `MessageError::WrongType` - leading byte is not `Self::TYPE`
    /// * `MessageError::Codec` - a field runs past the end of the buffer
    fn unmarshal_binary(data: &[u8], version: u16) -> MessageResult<(Self, &[u8])>
    where
        Self: Sized;

    /// Encoding covered by the signature and the identity hash.
    fn signable_bytes(&self) -> Vec<u8>;

    /// Cached identity hash.
    fn msg_hash(&self) -> Hash;

    fn timestamp(&self) -> Option<Timestamp>;

    /// Subject used for lane assignment.
    fn subject(&self) -> ChainId;

    /// Judge the message against current ledger state.
    fn validate(&self, ctx: &ValidationContext<'_>) -> Verdict;

    /// Sign the signable encoding, replacing any existing signature.
    fn sign(&mut self, signer: &dyn MessageSigner) -> MessageResult<()>;

    /// Eligible for the leader queue on a node with `role`.
    fn is_leader_candidate(&self, role: &RoleContext) -> MessageResult<bool>;

    /// Eligible for the follower queue on a node with `role`.
    fn is_follower_candidate(&self, role: &RoleContext) -> MessageResult<bool>;

    /// Apply the state transition. Called at most once per accepted
    /// message and execution mode.
    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<ExecutionReport, ExecutionError>;

    /// One-line human-readable summary.
    fn summary(&self) -> String;

    /// Structural equality ignoring cached state.
    fn is_same_as(&self, other: &Self) -> bool
    where
        Self: Sized;

    /// JSON export for the reporting layer.
    fn to_json(&self) -> MessageResult<String>
    where
        Self: Serialize + Sized,
    {
        serde_json::to_string(self).map_err(|e| MessageError::Json(e.to_string()))
    }
}

/// Check the leading type byte of `data` against `expected`.
pub(crate) fn expect_type(data: &[u8], expected: MessageType) -> MessageResult<()> {
    match data.first() {
        None => Err(MessageError::Empty),
        Some(&found) if found == expected.as_u8() => Ok(()),
        Some(&found) => Err(MessageError::WrongType {
            expected: expected.as_u8(),
            found,
        }),
    }
}
