//! # Reject Notice
//!
//! Tells a peer that one of its messages was refused. Unsigned and
//! informational: followers log it, nothing touches the ledger.
//!
//! ## Wire layout
//!
//! ```text
//! type (1) | command (4 + n) | code (1) | reason (4 + n) | [hash (32) if command is block or tx]
//! ```
//!
//! Requires protocol version [`REJECT_MIN_VERSION`].

use super::common::HashCache;
use crate::contract::{expect_type, MessageVariant};
use crate::domain::{
    ExecutionContext, ExecutionError, ExecutionMode, ExecutionOutcome, ExecutionReport,
    MessageError, MessageResult, MessageType, RejectCode, RoleContext, ValidationContext,
    CMD_BLOCK, CMD_TX, PROTOCOL_VERSION, REJECT_MIN_VERSION,
};
use fc_02_signatures::MessageSigner;
use serde::Serialize;
use shared_types::{ByteReader, ByteWriter, ChainId, Hash, Timestamp, Verdict, ADMIN_CHAIN_ID};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectMsg {
    /// Command of the refused message.
    command: String,
    code: RejectCode,
    reason: String,
    /// Hash of the refused block or transaction.
    hash: Option<Hash>,
    #[serde(skip)]
    cache: HashCache,
}

/// Whether reject notices for `command` carry a hash.
pub fn command_has_hash(command: &str) -> bool {
    command == CMD_BLOCK || command == CMD_TX
}

impl RejectMsg {
    /// Build a notice. `hash` is required for block and transaction
    /// commands and dropped for every other command.
    pub fn new(
        command: impl Into<String>,
        code: RejectCode,
        reason: impl Into<String>,
        hash: Option<Hash>,
    ) -> MessageResult<Self> {
        let command = command.into();
        let hash = if command_has_hash(&command) {
            Some(hash.ok_or_else(|| MessageError::MissingHash(command.clone()))?)
        } else {
            None
        };
        Ok(Self {
            command,
            code,
            reason: reason.into(),
            hash,
            cache: HashCache::default(),
        })
    }

    pub fn rejected_command(&self) -> &str {
        &self.command
    }

    pub fn code(&self) -> RejectCode {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn hash(&self) -> Option<&Hash> {
        self.hash.as_ref()
    }

    /// Encode for a peer that negotiated protocol `version`.
    pub fn marshal_versioned(&self, version: u16) -> MessageResult<Vec<u8>> {
        check_version(version)?;
        Ok(self.signable_bytes())
    }
}

fn check_version(version: u16) -> MessageResult<()> {
    if version < REJECT_MIN_VERSION {
        return Err(MessageError::ProtocolVersion {
            command: MessageType::Reject.command(),
            required: REJECT_MIN_VERSION,
            negotiated: version,
        });
    }
    Ok(())
}

impl MessageVariant for RejectMsg {
    const TYPE: MessageType = MessageType::Reject;

    fn marshal_binary(&self) -> MessageResult<Vec<u8>> {
        self.marshal_versioned(PROTOCOL_VERSION)
    }

    fn unmarshal_binary(data: &[u8], version: u16) -> MessageResult<(Self, &[u8])> {
        check_version(version)?;
        expect_type(data, Self::TYPE)?;
        let mut r = ByteReader::new(&data[1..]);
        let command = r.prefixed_str("reject command")?;
        let code = RejectCode(r.u8("reject code")?);
        let reason = r.prefixed_str("reject reason")?;
        let hash = if command_has_hash(&command) {
            Some(r.array("reject hash")?)
        } else {
            None
        };
        let msg = Self {
            command,
            code,
            reason,
            hash,
            cache: HashCache::default(),
        };
        Ok((msg, r.rest()))
    }

    /// Notices are unsigned; the whole encoding is signable.
    fn signable_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(10 + self.command.len() + self.reason.len() + 32);
        w.put_u8(Self::TYPE.as_u8())
            .put_prefixed_str(&self.command)
            .put_u8(self.code.0)
            .put_prefixed_str(&self.reason);
        if let Some(hash) = &self.hash {
            w.put_bytes(hash);
        }
        w.into_inner()
    }

    fn msg_hash(&self) -> Hash {
        self.cache.get_or_compute(|| self.signable_bytes())
    }

    fn timestamp(&self) -> Option<Timestamp> {
        None
    }

    fn subject(&self) -> ChainId {
        ADMIN_CHAIN_ID
    }

    fn validate(&self, _ctx: &ValidationContext<'_>) -> Verdict {
        Verdict::Accepted
    }

    fn sign(&mut self, _signer: &dyn MessageSigner) -> MessageResult<()> {
        Err(MessageError::Unsupported(
            "reject notices are not signed".to_string(),
        ))
    }

    fn is_leader_candidate(&self, _role: &RoleContext) -> MessageResult<bool> {
        Err(MessageError::Unsupported(
            "leader handling of reject notices".to_string(),
        ))
    }

    fn is_follower_candidate(&self, _role: &RoleContext) -> MessageResult<bool> {
        Ok(true)
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<ExecutionReport, ExecutionError> {
        if ctx.mode == ExecutionMode::Leader {
            return Err(ExecutionError::Unsupported(
                "leader handling of reject notices".to_string(),
            ));
        }
        warn!(
            command = %self.command,
            code = %self.code,
            reason = %self.reason,
            "Peer rejected a message"
        );
        Ok(ExecutionReport {
            message_type: Self::TYPE,
            msg_hash: self.msg_hash(),
            timestamp: None,
            mode: ctx.mode,
            outcome: ExecutionOutcome::Logged,
            summary: self.summary(),
        })
    }

    fn summary(&self) -> String {
        self.to_string()
    }

    fn is_same_as(&self, other: &Self) -> bool {
        self.command == other.command
            && self.code == other.code
            && self.reason == other.reason
            && self.hash == other.hash
    }
}

impl fmt::Display for RejectMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reject: cmd {}, code {}, reason '{}'",
            self.command, self.code, self.reason
        )?;
        if let Some(hash) = &self.hash {
            write!(f, ", hash {}", hex::encode(hash))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::test_support::{signer, single_federation, validate};
    use shared_types::{NetworkMode, ServerRole};

    #[test]
    fn test_block_reject_carries_hash() {
        let msg = RejectMsg::new(CMD_BLOCK, RejectCode::INVALID, "bad merkle root", Some([7; 32])).unwrap();
        let bytes = msg.marshal_binary().unwrap();
        let (decoded, rest) = RejectMsg::unmarshal_binary(&bytes, PROTOCOL_VERSION).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded.hash(), Some(&[7; 32]));
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_other_commands_carry_no_hash() {
        let msg = RejectMsg::new("handshake", RejectCode::OBSOLETE, "old", Some([7; 32])).unwrap();
        assert_eq!(msg.hash(), None);
        let bytes = msg.marshal_binary().unwrap();
        let (decoded, rest) = RejectMsg::unmarshal_binary(&bytes, PROTOCOL_VERSION).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded.hash(), None);
        assert_eq!(decoded.rejected_command(), "handshake");
    }

    #[test]
    fn test_tx_reject_requires_hash() {
        assert_eq!(
            RejectMsg::new(CMD_TX, RejectCode::DUST, "dust", None).unwrap_err(),
            MessageError::MissingHash("tx".to_string())
        );
    }

    #[test]
    fn test_truncated_hash_fails() {
        let msg = RejectMsg::new(CMD_TX, RejectCode::DUST, "dust", Some([1; 32])).unwrap();
        let bytes = msg.marshal_binary().unwrap();
        let err = RejectMsg::unmarshal_binary(&bytes[..bytes.len() - 1], PROTOCOL_VERSION).unwrap_err();
        assert!(matches!(err, MessageError::Codec(_)));
    }

    #[test]
    fn test_protocol_version_gate() {
        let msg = RejectMsg::new("ping", RejectCode::MALFORMED, "", None).unwrap();
        let expected = MessageError::ProtocolVersion {
            command: "reject",
            required: REJECT_MIN_VERSION,
            negotiated: 1,
        };
        assert_eq!(msg.marshal_versioned(1).unwrap_err(), expected);

        let bytes = msg.marshal_binary().unwrap();
        assert_eq!(RejectMsg::unmarshal_binary(&bytes, 1).unwrap_err(), expected);
    }

    #[test]
    fn test_contract_behaviour() {
        let fed = single_federation();
        let mut msg = RejectMsg::new("ping", RejectCode::DUPLICATE, "seen", None).unwrap();
        assert_eq!(validate(&fed.ledger, &msg), Verdict::Accepted);
        assert!(matches!(msg.sign(&signer(1)), Err(MessageError::Unsupported(_))));

        let role = RoleContext {
            role: ServerRole::Federated,
            network: NetworkMode::Local,
            leads_lane: true,
        };
        assert!(matches!(msg.is_leader_candidate(&role), Err(MessageError::Unsupported(_))));
        assert!(msg.is_follower_candidate(&role).unwrap());

        let follower = ExecutionContext {
            ledger: &fed.ledger,
            mode: ExecutionMode::Follower,
        };
        assert_eq!(msg.execute(&follower).unwrap().outcome, ExecutionOutcome::Logged);

        let leader = ExecutionContext {
            ledger: &fed.ledger,
            mode: ExecutionMode::Leader,
        };
        assert!(matches!(msg.execute(&leader), Err(ExecutionError::Unsupported(_))));
    }

    #[test]
    fn test_summary() {
        let msg = RejectMsg::new(CMD_BLOCK, RejectCode::CHECKPOINT, "fork", Some([0; 32])).unwrap();
        assert!(msg.summary().starts_with("Reject: cmd block, code REJECT_CHECKPOINT, reason 'fork', hash 0000"));
    }
}
