//! # Messages
//!
//! The polymorphic message contract and the administrative variants that
//! implement it.
//!
//! ## Architecture
//!
//! - `contract` - `MessageVariant`: encode/decode, identity hash, validate,
//!   sign, role predicates, execute
//! - `variants` - `RejectMsg`, `AddServerMsg`, `RemoveServerMsg`, `EndOfBlockMsg`
//! - `message` - `Message`, the closed set dispatched on by type byte
//! - `domain` - types, errors, validation/execution contexts
//!
//! ## Validation verdicts
//!
//! | Verdict | Meaning |
//! |---------|---------|
//! | `Invalid` (-1) | malformed, unauthorized, stale - dropped |
//! | `Deferred` (0) | depends on state not yet observed - retried |
//! | `Accepted` (1) | routed to leader and/or follower execution |

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod contract;
pub mod domain;
pub mod message;
pub mod variants;

pub use contract::MessageVariant;
pub use domain::{
    ExecutionContext, ExecutionError, ExecutionMode, ExecutionOutcome, ExecutionReport,
    MessageError, MessageResult, MessageType, RejectCode, RoleContext, ValidationContext,
    CMD_BLOCK, CMD_TX, PROTOCOL_VERSION, REJECT_MIN_VERSION,
};
pub use message::Message;
pub use variants::{AddServerMsg, EndOfBlockMsg, RejectMsg, RemoveServerMsg};
