//! # Validation and Execution Context
//!
//! Everything a message needs from the node to validate, classify and
//! execute itself. Built by the dispatcher; messages never reach for
//! process-wide state.

use fc_02_signatures::SignatureVerifier;
use fc_03_ledger_state::{LedgerState, VoteOutcome};
use serde::Serialize;
use shared_types::{Hash, NetworkMode, ServerRole, Timestamp};
use std::fmt;

use super::types::MessageType;

/// Inputs to `validate`.
pub struct ValidationContext<'a> {
    /// Ledger height snapshot taken by the caller.
    pub height: u64,
    pub ledger: &'a LedgerState,
    pub verifier: &'a dyn SignatureVerifier,
}

impl<'a> ValidationContext<'a> {
    /// Snapshot the current height of `ledger`.
    pub fn new(ledger: &'a LedgerState, verifier: &'a dyn SignatureVerifier) -> Self {
        Self {
            height: ledger.height(),
            ledger,
            verifier,
        }
    }
}

/// Inputs to the role predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleContext {
    pub role: ServerRole,
    pub network: NetworkMode,
    /// Whether this node leads the lane the message was assigned to.
    pub leads_lane: bool,
}

impl RoleContext {
    /// A federated server leading the message's lane.
    #[must_use]
    pub fn is_lane_leader(&self) -> bool {
        self.role == ServerRole::Federated && self.leads_lane
    }
}

/// Which dispatch path is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Leader,
    Follower,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leader => f.write_str("leader"),
            Self::Follower => f.write_str("follower"),
        }
    }
}

/// Inputs to `execute`.
pub struct ExecutionContext<'a> {
    pub ledger: &'a LedgerState,
    pub mode: ExecutionMode,
}

/// What an execution did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Vote recorded, majority not yet reached.
    VotePending { votes: usize, needed: usize },
    /// The ledger transition was applied.
    Applied,
    /// Nothing to apply; the message was recorded in the log only.
    Logged,
}

impl From<VoteOutcome> for ExecutionOutcome {
    fn from(outcome: VoteOutcome) -> Self {
        match outcome {
            VoteOutcome::Pending { votes, needed } => Self::VotePending { votes, needed },
            VoteOutcome::Applied => Self::Applied,
        }
    }
}

/// Result of a successful execution, consumed by the reporting layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub message_type: MessageType,
    pub msg_hash: Hash,
    pub timestamp: Option<Timestamp>,
    pub mode: ExecutionMode,
    pub outcome: ExecutionOutcome,
    pub summary: String,
}
