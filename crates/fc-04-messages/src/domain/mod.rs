//! Domain layer: types, errors and the contexts messages operate in.

pub mod context;
pub mod errors;
pub mod types;

pub use context::{
    ExecutionContext, ExecutionMode, ExecutionOutcome, ExecutionReport, RoleContext,
    ValidationContext,
};
pub use errors::{ExecutionError, MessageError, MessageResult};
pub use types::{MessageType, RejectCode, CMD_BLOCK, CMD_TX, PROTOCOL_VERSION, REJECT_MIN_VERSION};
