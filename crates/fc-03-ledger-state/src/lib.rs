//! # Ledger State
//!
//! Tracks ledger height, head references and the authority set, and maps
//! message subjects onto execution lanes.
//!
//! ## Architecture
//!
//! - `domain` - authority set, lane hashing, head records, vote tallies
//! - `ports` - `KeyValueStore` (namespaced get/put)
//! - `adapters` - `InMemoryStore`
//! - `service` - `LedgerState`, the shared mutable state
//!
//! ## Invariants
//!
//! - Height is monotonically non-decreasing and advances only through
//!   block completion.
//! - A message hash is applied at most once.
//! - `compute_lane` is a pure function of subject and lane count.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryStore;
pub use domain::{
    compute_lane, AdminAction, Authority, AuthoritySet, HeadRecord, KvStoreError, Lane,
    LedgerError, LedgerResult, VoteOutcome,
};
pub use ports::{KeyValueStore, NAMESPACES, NS_ADMIN, NS_DIRECTORY_BLOCKS};
pub use service::{LedgerConfig, LedgerState};
