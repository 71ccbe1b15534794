//! Concrete message variants.

mod common;
pub mod add_server;
pub mod end_of_block;
pub mod reject;
pub mod remove_server;

#[cfg(test)]
pub(crate) mod test_support;

pub use add_server::AddServerMsg;
pub use end_of_block::EndOfBlockMsg;
pub use reject::{command_has_hash, RejectMsg};
pub use remove_server::RemoveServerMsg;
