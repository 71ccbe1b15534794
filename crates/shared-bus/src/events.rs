//! # Node Events
//!
//! Everything the dispatcher and runtime report to the outside: terminal
//! states of messages, ledger transitions and peer lifecycle. Consumed by
//! the reporting layer and by tests.

use serde::{Deserialize, Serialize};
use shared_types::{Hash, Timestamp};
use uuid::Uuid;

/// Accessor snapshot of a message at the moment an event is raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Command tag, e.g. `removeserver`.
    pub command: String,
    #[serde(with = "hex_hash")]
    pub msg_hash: Hash,
    pub timestamp: Option<Timestamp>,
    /// Human-readable one-liner.
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeEvent {
    // =========================================================================
    // EXECUTION
    // =========================================================================
    /// A message reached `Executed(Success)`.
    MessageExecuted {
        record: MessageRecord,
        /// `leader` or `follower`.
        mode: String,
        /// Outcome description, e.g. `applied` or `pending 1/2`.
        outcome: String,
    },

    /// A message reached `Executed(Failure)`.
    ExecutionFailed {
        record: MessageRecord,
        mode: String,
        error: String,
    },

    // =========================================================================
    // VALIDATION
    // =========================================================================
    /// Validation returned `Invalid`; the message was dropped.
    MessageInvalid { record: MessageRecord },

    /// A deferred message ran out of retries and was dropped.
    DeferredExpired { record: MessageRecord, attempts: u32 },

    // =========================================================================
    // LEDGER
    // =========================================================================
    /// Block completion advanced the ledger.
    HeightAdvanced {
        height: u64,
        #[serde(with = "hex_hash")]
        head: Hash,
    },

    /// The authority set changed size.
    AuthoritySetChanged { federated: usize, total: usize },

    // =========================================================================
    // PEERS
    // =========================================================================
    PeerConnected { conn_id: Uuid, addr: String },

    PeerDisconnected {
        conn_id: Uuid,
        addr: String,
        reason: String,
    },
}

impl NodeEvent {
    /// Topic used for subscription filtering.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::MessageExecuted { .. } | Self::ExecutionFailed { .. } => EventTopic::Execution,
            Self::MessageInvalid { .. } | Self::DeferredExpired { .. } => EventTopic::Validation,
            Self::HeightAdvanced { .. } | Self::AuthoritySetChanged { .. } => EventTopic::Ledger,
            Self::PeerConnected { .. } | Self::PeerDisconnected { .. } => EventTopic::Peers,
        }
    }

    /// Message record, for message-scoped events.
    #[must_use]
    pub fn record(&self) -> Option<&MessageRecord> {
        match self {
            Self::MessageExecuted { record, .. }
            | Self::ExecutionFailed { record, .. }
            | Self::MessageInvalid { record }
            | Self::DeferredExpired { record, .. } => Some(record),
            _ => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Execution,
    Validation,
    Ledger,
    Peers,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    #[must_use]
    pub fn matches(&self, event: &NodeEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}

mod hex_hash {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use shared_types::Hash;

    pub fn serialize<S: Serializer>(hash: &Hash, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(&s).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("hash must be 32 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MessageRecord {
        MessageRecord {
            command: "removeserver".to_string(),
            msg_hash: [0xab; 32],
            timestamp: Some(Timestamp::from_millis(42)),
            summary: "RemoveServer (Federated)".to_string(),
        }
    }

    #[test]
    fn test_event_topic_mapping() {
        let event = NodeEvent::MessageInvalid { record: record() };
        assert_eq!(event.topic(), EventTopic::Validation);
        assert_eq!(event.record().unwrap().command, "removeserver");

        let event = NodeEvent::HeightAdvanced { height: 1, head: [0; 32] };
        assert_eq!(event.topic(), EventTopic::Ledger);
        assert!(event.record().is_none());
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        assert!(filter.matches(&NodeEvent::AuthoritySetChanged { federated: 1, total: 1 }));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Execution]);
        let executed = NodeEvent::MessageExecuted {
            record: record(),
            mode: "leader".to_string(),
            outcome: "applied".to_string(),
        };
        assert!(filter.matches(&executed));
        assert!(!filter.matches(&NodeEvent::MessageInvalid { record: record() }));
    }

    #[test]
    fn test_json_hashes_are_hex() {
        let json = serde_json::to_string(&NodeEvent::MessageInvalid { record: record() }).unwrap();
        assert!(json.contains(&"ab".repeat(32)));
        let back: NodeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, NodeEvent::MessageInvalid { record: record() });
    }
}
