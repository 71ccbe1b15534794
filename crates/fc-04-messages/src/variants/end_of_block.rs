//! # End-of-Block
//!
//! A federated server's vote that the block at `height` is complete. The
//! only message that moves ledger height.
//!
//! ## Wire layout
//!
//! ```text
//! type (1) | timestamp (6) | server chain id (32) | height (8) | [signature (96)]
//! ```

use super::common::{authenticate, read_optional_signature, report, signer_of, HashCache};
use crate::contract::{expect_type, MessageVariant};
use crate::domain::{
    ExecutionContext, ExecutionError, ExecutionReport, MessageResult, MessageType, RoleContext,
    ValidationContext,
};
use fc_02_signatures::{MessageSigner, SignatureBlock};
use serde::Serialize;
use shared_types::{
    ByteReader, ByteWriter, ChainId, Hash, Timestamp, Verdict, ADMIN_CHAIN_ID,
};
use std::fmt;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndOfBlockMsg {
    timestamp: Timestamp,
    server_chain_id: ChainId,
    height: u64,
    signature: Option<SignatureBlock>,
    #[serde(skip)]
    hash: HashCache,
}

impl EndOfBlockMsg {
    /// Unsigned completion vote by `server_chain_id` for `height`.
    #[must_use]
    pub fn new(server_chain_id: ChainId, height: u64, timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            server_chain_id,
            height,
            signature: None,
            hash: HashCache::default(),
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn server_chain_id(&self) -> &ChainId {
        &self.server_chain_id
    }

    pub fn signature(&self) -> Option<&SignatureBlock> {
        self.signature.as_ref()
    }

    fn write_signable(&self, w: &mut ByteWriter) {
        w.put_u8(Self::TYPE.as_u8())
            .put_bytes(&self.timestamp.to_wire())
            .put_bytes(self.server_chain_id.as_bytes())
            .put_u64(self.height);
    }
}

impl MessageVariant for EndOfBlockMsg {
    const TYPE: MessageType = MessageType::EndOfBlock;

    fn marshal_binary(&self) -> MessageResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(47 + SignatureBlock::WIRE_SIZE);
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
        let height = r.u64("height")?;
        let signature = read_optional_signature(&mut r)?;
        let msg = Self {
            timestamp,
            server_chain_id,
            height,
            signature,
            hash: HashCache::default(),
        };
        Ok((msg, r.rest()))
    }

    fn signable_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(47);
        self.write_signable(&mut w);
        w.into_inner()
    }

    fn msg_hash(&self) -> Hash {
        self.hash.get_or_compute(|| self.signable_bytes())
    }

    fn timestamp(&self) -> Option<Timestamp> {
        Some(self.timestamp)
    }

    /// Height changes are global, so every completion vote shares the
    /// admin chain's lane.
    fn subject(&self) -> ChainId {
        ADMIN_CHAIN_ID
    }

    /// Only authenticated votes are held back, so a future height cannot
    /// park unsigned or forged votes in the deferral heap.
    fn validate(&self, ctx: &ValidationContext<'_>) -> Verdict {
        if self.height < ctx.height {
            trace!(height = self.height, current = ctx.height, "Stale completion vote");
            return Verdict::Invalid;
        }
        let verdict = authenticate(
            ctx,
            &self.signable_bytes(),
            self.signature.as_ref(),
            Some(&self.server_chain_id),
        );
        if verdict == Verdict::Accepted && self.height > ctx.height {
            trace!(height = self.height, current = ctx.height, "Completion vote from the future");
            return Verdict::Deferred;
        }
        verdict
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
            .complete_block(self.msg_hash(), &signer.chain_id, self.height)?;
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
            && self.height == other.height
            && self.signature == other.signature
    }
}

impl fmt::Display for EndOfBlockMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EndOfBlock: Height: {} Server: {} Time: {}",
            self.height,
            self.server_chain_id.short(),
            self.timestamp
        )
    }
}
