//! # Message
//!
//! Closed set of message variants. Decoding dispatches on the leading type
//! byte; every other operation forwards to the variant.

use crate::contract::MessageVariant;
use crate::domain::{
    ExecutionContext, ExecutionError, ExecutionReport, MessageError, MessageResult, MessageType,
    RoleContext, ValidationContext,
};
use crate::variants::{AddServerMsg, EndOfBlockMsg, RejectMsg, RemoveServerMsg};
use fc_02_signatures::{MessageSigner, SignatureBlock};
use serde::Serialize;
use shared_types::{sha256, ChainId, Hash, Timestamp, Verdict};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "body")]
pub enum Message {
    Reject(RejectMsg),
    AddServer(AddServerMsg),
    RemoveServer(RemoveServerMsg),
    EndOfBlock(EndOfBlockMsg),
}

macro_rules! each_variant {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            Message::Reject($m) => $body,
            Message::AddServer($m) => $body,
            Message::RemoveServer($m) => $body,
            Message::EndOfBlock($m) => $body,
        }
    };
}

impl Message {
    /// Decode one message occupying all of `data`.
    ///
    /// # Errors
    /// * `MessageError::Empty` - no type byte
    /// * `MessageError::UnknownType` - type byte not recognised
    /// * `MessageError::TrailingBytes` - bytes left after the message
    pub fn decode(data: &[u8], version: u16) -> MessageResult<Self> {
        let first = *data.first().ok_or(MessageError::Empty)?;
        let (msg, rest) = match MessageType::try_from(first)? {
            MessageType::Reject => {
                let (m, rest) = RejectMsg::unmarshal_binary(data, version)?;
                (Self::Reject(m), rest)
            }
            MessageType::AddServer => {
                let (m, rest) = AddServerMsg::unmarshal_binary(data, version)?;
                (Self::AddServer(m), rest)
            }
            MessageType::RemoveServer => {
                let (m, rest) = RemoveServerMsg::unmarshal_binary(data, version)?;
                (Self::RemoveServer(m), rest)
            }
            MessageType::EndOfBlock => {
                let (m, rest) = EndOfBlockMsg::unmarshal_binary(data, version)?;
                (Self::EndOfBlock(m), rest)
            }
        };
        if !rest.is_empty() {
            return Err(MessageError::TrailingBytes(rest.len()));
        }
        Ok(msg)
    }

    /// Canonical encoding.
    pub fn encode(&self) -> MessageResult<Vec<u8>> {
        each_variant!(self, m => m.marshal_binary())
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Reject(_) => RejectMsg::TYPE,
            Self::AddServer(_) => AddServerMsg::TYPE,
            Self::RemoveServer(_) => RemoveServerMsg::TYPE,
            Self::EndOfBlock(_) => EndOfBlockMsg::TYPE,
        }
    }

    pub fn command(&self) -> &'static str {
        self.message_type().command()
    }

    pub fn msg_hash(&self) -> Hash {
        each_variant!(self, m => m.msg_hash())
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        each_variant!(self, m => m.timestamp())
    }

    /// Signature block of a signed admin message; `None` for notices and
    /// unsigned messages.
    pub fn signature(&self) -> Option<&SignatureBlock> {
        match self {
            Self::Reject(_) => None,
            Self::AddServer(m) => m.signature(),
            Self::RemoveServer(m) => m.signature(),
            Self::EndOfBlock(m) => m.signature(),
        }
    }

    /// Identity for duplicate suppression. `msg_hash` leaves the signature
    /// out, so two copies of one body signed by different keys, or carrying
    /// a bad signature, share it. This key covers the signature block too.
    pub fn dedup_key(&self) -> Hash {
        let hash = self.msg_hash();
        match self.signature() {
            None => hash,
            Some(sig) => {
                let mut buf = Vec::with_capacity(32 + SignatureBlock::WIRE_SIZE);
                buf.extend_from_slice(&hash);
                buf.extend_from_slice(&sig.public_key);
                buf.extend_from_slice(&sig.signature);
                sha256(&buf)
            }
        }
    }

    pub fn subject(&self) -> ChainId {
        each_variant!(self, m => m.subject())
    }

    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Verdict {
        each_variant!(self, m => m.validate(ctx))
    }

    pub fn sign(&mut self, signer: &dyn MessageSigner) -> MessageResult<()> {
        each_variant!(self, m => m.sign(signer))
    }

    pub fn is_leader_candidate(&self, role: &RoleContext) -> MessageResult<bool> {
        each_variant!(self, m => m.is_leader_candidate(role))
    }

    pub fn is_follower_candidate(&self, role: &RoleContext) -> MessageResult<bool> {
        each_variant!(self, m => m.is_follower_candidate(role))
    }

    pub fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<ExecutionReport, ExecutionError> {
        each_variant!(self, m => m.execute(ctx))
    }

    pub fn summary(&self) -> String {
        each_variant!(self, m => m.summary())
    }

    /// Structural equality; messages of different types are never the same.
    pub fn is_same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Reject(a), Self::Reject(b)) => a.is_same_as(b),
            (Self::AddServer(a), Self::AddServer(b)) => a.is_same_as(b),
            (Self::RemoveServer(a), Self::RemoveServer(b)) => a.is_same_as(b),
            (Self::EndOfBlock(a), Self::EndOfBlock(b)) => a.is_same_as(b),
            _ => false,
        }
    }

    pub fn to_json(&self) -> MessageResult<String> {
        serde_json::to_string(self).map_err(|e| MessageError::Json(e.to_string()))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl From<RejectMsg> for Message {
    fn from(m: RejectMsg) -> Self {
        Self::Reject(m)
    }
}

impl From<AddServerMsg> for Message {
    fn from(m: AddServerMsg) -> Self {
        Self::AddServer(m)
    }
}

impl From<RemoveServerMsg> for Message {
    fn from(m: RemoveServerMsg) -> Self {
        Self::RemoveServer(m)
    }
}

impl From<EndOfBlockMsg> for Message {
    fn from(m: EndOfBlockMsg) -> Self {
        Self::EndOfBlock(m)
    }
}
