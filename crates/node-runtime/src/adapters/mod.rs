//! # Adapters
//!
//! Node-side implementations of the outer edges: TCP peers and ledger
//! storage backends.

pub mod peers;
pub mod storage;

pub use peers::{PeerManager, PeerSettings};
pub use storage::open_store;
