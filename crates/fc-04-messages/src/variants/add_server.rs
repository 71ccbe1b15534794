//! # Add-Server Request
//!
//! Structural twin of the remove-server request that also carries the
//! signing key of the server being added.
//!
//! ## Wire layout
//!
//! ```text
//! type (1) | timestamp (6) | server chain id (32) | server type (1) | server key (32) | [signature (96)]
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
use shared_types::{
    AuthorityRole, ByteReader, ByteWriter, ChainId, Hash, PublicKey, Timestamp, Verdict,
};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddServerMsg {
    timestamp: Timestamp,
    server_chain_id: ChainId,
    server_type: AuthorityRole,
    server_key: PublicKey,
    signature: Option<SignatureBlock>,
    #[serde(skip)]
    hash: HashCache,
}

impl AddServerMsg {
    #[must_use]
    pub fn new(
        server_chain_id: ChainId,
        server_type: AuthorityRole,
        server_key: PublicKey,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            timestamp,
            server_chain_id,
            server_type,
            server_key,
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

    pub fn server_key(&self) -> &PublicKey {
        &self.server_key
    }

    pub fn signature(&self) -> Option<&SignatureBlock> {
        self.signature.as_ref()
    }

    fn write_signable(&self, w: &mut ByteWriter) {
        w.put_u8(Self::TYPE.as_u8())
            .put_bytes(&self.timestamp.to_wire())
            .put_bytes(self.server_chain_id.as_bytes())
            .put_u8(self.server_type.as_u8())
            .put_bytes(&self.server_key);
    }
}

impl MessageVariant for AddServerMsg {
    const TYPE: MessageType = MessageType::AddServer;

    fn marshal_binary(&self) -> MessageResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(72 + SignatureBlock::WIRE_SIZE);
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
        let server_key = r.array("server key")?;
        let signature = read_optional_signature(&mut r)?;
        let msg = Self {
            timestamp,
            server_chain_id,
            server_type,
            server_key,
            signature,
            hash: HashCache::default(),
        };
        Ok((msg, r.rest()))
    }

    fn signable_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(72);
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
        if let Some(existing) = ctx.ledger.authority(&self.server_chain_id) {
            if existing.role == self.server_type && existing.public_key == self.server_key {
                debug!(subject = %self.server_chain_id.short(), "Server already in authority set");
                return Verdict::Invalid;
            }
        }
        authenticate(ctx, &self.signable_bytes(), self.signature.as_ref(), None)
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
        let action = AdminAction::AddServer {
            chain_id: self.server_chain_id,
            role: self.server_type,
            public_key: self.server_key,
        };
        let outcome = ctx
            .ledger
            .apply_admin_vote(self.msg_hash(), &signer.chain_id, &action)?;
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
            && self.server_key == other.server_key
            && self.signature == other.signature
    }
}

impl fmt::Display for AddServerMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AddServer ({}): ChainID: {} Key: {} Time: {}",
            self.server_type,
            self.server_chain_id.short(),
            hex::encode(&self.server_key[..4]),
            self.timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutionMode, ExecutionOutcome, PROTOCOL_VERSION};
    use crate::variants::test_support::{signer, validate, Federation};

    fn new_server() -> AddServerMsg {
        AddServerMsg::new(
            ChainId::new([0x50; 32]),
            AuthorityRole::Audit,
            signer(0x50).public_key(),
            Timestamp::from_millis(1_700_000_000_000),
        )
    }

    #[test]
    fn test_roundtrip() {
        let fed = Federation::new(1);
        let mut msg = new_server();
        msg.sign(&fed.signers[0]).unwrap();
        let bytes = msg.marshal_binary().unwrap();
        assert_eq!(bytes.len(), 72 + SignatureBlock::WIRE_SIZE);

        let (decoded, rest) = AddServerMsg::unmarshal_binary(&bytes, PROTOCOL_VERSION).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, msg);
        assert!(decoded.is_same_as(&msg));
    }

    #[test]
    fn test_validation() {
        let fed = Federation::new(2);
        let mut msg = new_server();
        assert_eq!(validate(&fed.ledger, &msg), Verdict::Invalid);

        msg.sign(&fed.signers[1]).unwrap();
        assert_eq!(validate(&fed.ledger, &msg), Verdict::Accepted);

        let mut duplicate = AddServerMsg::new(
            fed.chain_id(0),
            AuthorityRole::Federated,
            fed.public_key(0),
            Timestamp::now(),
        );
        duplicate.sign(&fed.signers[1]).unwrap();
        assert_eq!(validate(&fed.ledger, &duplicate), Verdict::Invalid);
    }

    #[test]
    fn test_key_tampered_after_signing() {
        let fed = Federation::new(1);
        let mut msg = new_server();
        msg.sign(&fed.signers[0]).unwrap();
        let mut bytes = msg.marshal_binary().unwrap();
        bytes[45] ^= 0xff;
        let (tampered, _) = AddServerMsg::unmarshal_binary(&bytes, PROTOCOL_VERSION).unwrap();
        assert_eq!(validate(&fed.ledger, &tampered), Verdict::Invalid);
    }

    #[test]
    fn test_execute_adds_server() {
        let fed = Federation::new(1);
        let mut msg = new_server();
        msg.sign(&fed.signers[0]).unwrap();
        let ctx = ExecutionContext {
            ledger: &fed.ledger,
            mode: ExecutionMode::Leader,
        };
        let report = msg.execute(&ctx).unwrap();
        assert_eq!(report.outcome, ExecutionOutcome::Applied);
        assert_eq!(report.mode, ExecutionMode::Leader);
        let added = fed.ledger.authority(&ChainId::new([0x50; 32])).unwrap();
        assert_eq!(added.role, AuthorityRole::Audit);
        assert_eq!(added.public_key, signer(0x50).public_key());
    }

    #[test]
    fn test_summary() {
        let msg = new_server();
        assert!(msg.summary().starts_with("AddServer (Audit): ChainID: 505050 Key: "));
    }
}
