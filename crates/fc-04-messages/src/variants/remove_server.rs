//! # Remove-Server Request
//!
//! Asks the federation to drop a server from the authority set. Takes
//! effect once a federated majority has signed the identical request.
//!
//! ## Wire layout
//!
//! ```text
//! type (1) | timestamp (6) | server chain id (32) | server type (1) | [signature (96)]
//! ```

use super::common::{authenticate, read_optional_signature, report, signer_of, HashCache};
use crate::contract::{expect_type, MessageVariant};
use crate::domain::{
    ExecutionContext, ExecutionError, ExecutionReport, MessageResult, MessageType, RoleContext,
    ValidationContext,
};
use fc_02_signatures::{MessageSigner, SignatureBlock};
use fc_03_ledger_state::AdminAction;
use serde::Serialize;
use shared_types::{AuthorityRole, ByteReader, ByteWriter, ChainId, Hash, Timestamp, Verdict};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveServerMsg {
    timestamp: Timestamp,
    server_chain_id: ChainId,
    server_type: AuthorityRole,
    signature: Option<SignatureBlock>,
    #[serde(skip)]
    hash: HashCache,
}

impl RemoveServerMsg {
    /// Unsigned request to remove `server_chain_id` holding `server_type`.
    #[must_use]
    pub fn new(server_chain_id: ChainId, server_type: AuthorityRole, timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            server_chain_id,
            server_type,
            signature: None,
            hash: HashCache::default(),
        }
    }

    pub fn server_chain_id(&self) -> &ChainId {
        &self.server_chain_id
    }

    pub fn server_type(&self) -> AuthorityRole {
        self.server_type
    }

    pub fn signature(&self) -> Option<&SignatureBlock> {
        self.signature.as_ref()
    }

    fn action(&self) -> AdminAction {
        AdminAction::RemoveServer {
            chain_id: self.server_chain_id,
            role: self.server_type,
        }
    }

    fn write_signable(&self, w: &mut ByteWriter) {
        w.put_u8(Self::TYPE.as_u8())
            .put_bytes(&self.timestamp.to_wire())
            .put_bytes(self.server_chain_id.as_bytes())
            .put_u8(self.server_type.as_u8());
    }
}

impl MessageVariant for RemoveServerMsg {
    const TYPE: MessageType = MessageType::RemoveServer;

    fn marshal_binary(&self) -> MessageResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(40 + SignatureBlock::WIRE_SIZE);
        self.write_signable(&mut w);
        if let Some(sig) = &self.signature {
            sig.write(&mut w);
        }
        Ok(w.into_inner())
    }

    fn unmarshal_binary(data: &[u8], _version: u16) -> MessageResult<(Self, &[u8])> {
        expect_type(data, Self::TYPE)?;
        let mut r = ByteReader::new(&data[1..]);
        let timestamp = Timestamp::from_wire(r.array("timestamp")?);
        let server_chain_id = ChainId::new(r.array("server chain id")?);
        let server_type = AuthorityRole::try_from(r.u8("server type")?)?;
        let signature = read_optional_signature(&mut r)?;
        let msg = Self {
            timestamp,
            server_chain_id,
            server_type,
            signature,
            hash: HashCache::default(),
        };
        Ok((msg, r.rest()))
    }

    fn signable_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(40);
        self.write_signable(&mut w);
        w.into_inner()
    }

    fn msg_hash(&self) -> Hash {
        self.hash.get_or_compute(|| self.signable_bytes())
    }

    fn timestamp(&self) -> Option<Timestamp> {
        Some(self.timestamp)
    }

    fn subject(&self) -> ChainId {
        self.server_chain_id
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Verdict {
        let verdict = authenticate(ctx, &self.signable_bytes(), self.signature.as_ref(), None);
        if verdict != Verdict::Accepted {
            return verdict;
        }
        match ctx.ledger.authority(&self.server_chain_id) {
            None => {
                debug!(subject = %self.server_chain_id.short(), "Remove request for unknown server");
                Verdict::Deferred
            }
            Some(existing) if existing.role != self.server_type => {
                debug!(
                    subject = %self.server_chain_id.short(),
                    claimed = %self.server_type,
                    actual = %existing.role,
                    "Remove request names the wrong role"
                );
                Verdict::Invalid
            }
            Some(_) => Verdict::Accepted,
        }
    }

    fn sign(&mut self, signer: &dyn MessageSigner) -> MessageResult<()> {
        self.signature = Some(signer.sign(&self.signable_bytes()));
        Ok(())
    }

    fn is_leader_candidate(&self, role: &RoleContext) -> MessageResult<bool> {
        Ok(role.is_lane_leader())
    }

    fn is_follower_candidate(&self, role: &RoleContext) -> MessageResult<bool> {
        Ok(!role.is_lane_leader())
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<ExecutionReport, ExecutionError> {
        let signer = signer_of(ctx, self.signature.as_ref())?;
        let outcome = ctx
            .ledger
            .apply_admin_vote(self.msg_hash(), &signer.chain_id, &self.action())?;
        Ok(report(
            ctx,
            Self::TYPE,
            self.msg_hash(),
            Some(self.timestamp),
            outcome,
            self.summary(),
        ))
    }

    fn summary(&self) -> String {
        self.to_string()
    }

    fn is_same_as(&self, other: &Self) -> bool {
        self.timestamp.as_millis() == other.timestamp.as_millis()
            && self.server_chain_id == other.server_chain_id
            && self.server_type == other.server_type
            && self.signature == other.signature
    }
}

impl fmt::Display for RemoveServerMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RemoveServer ({}): ChainID: {} Time: {}",
            self.server_type,
            self.server_chain_id.short(),
            self.timestamp
        )
    }
}
