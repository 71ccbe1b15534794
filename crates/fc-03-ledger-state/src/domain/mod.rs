//! Domain layer for ledger state.

pub mod authority;
pub mod errors;
pub mod lanes;
pub mod records;
pub mod votes;

pub use authority::{Authority, AuthoritySet};
pub use errors::{KvStoreError, LedgerError, LedgerResult};
pub use lanes::{compute_lane, leads_lane, Lane};
pub use records::{AdminAction, HeadRecord, VoteOutcome};
pub use votes::{AppliedLog, VoteTally};
