//! # Envelope
//!
//! A message in flight through the dispatcher, with the routing state the
//! queues need: lane, origin and deferral count.

use fc_03_ledger_state::Lane;
use fc_04_messages::Message;
use shared_bus::MessageRecord;
use std::fmt;
use std::sync::Arc;

/// Where a message entered the node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Received from a peer at this address.
    Peer(String),
    /// Created by this node.
    Local,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Peer(addr) => f.write_str(addr),
            Self::Local => f.write_str("local"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub message: Arc<Message>,
    /// Assigned at intake from the message subject.
    pub lane: Lane,
    pub origin: Origin,
    /// Number of `Deferred` verdicts so far.
    pub attempts: u32,
}

impl Envelope {
    #[must_use]
    pub fn new(message: Message, origin: Origin) -> Self {
        Self {
            message: Arc::new(message),
            lane: 0,
            origin,
            attempts: 0,
        }
    }

    #[must_use]
    pub fn from_peer(message: Message, addr: impl Into<String>) -> Self {
        Self::new(message, Origin::Peer(addr.into()))
    }

    #[must_use]
    pub fn local(message: Message) -> Self {
        Self::new(message, Origin::Local)
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }

    /// Hex prefix of the message hash, for logs.
    #[must_use]
    pub fn short_hash(&self) -> String {
        hex::encode(&self.message.msg_hash()[..4])
    }

    /// Snapshot for event reporting.
    #[must_use]
    pub fn record(&self) -> MessageRecord {
        MessageRecord {
            command: self.message.command().to_string(),
            msg_hash: self.message.msg_hash(),
            timestamp: self.message.timestamp(),
            summary: self.message.summary(),
        }
    }
}
