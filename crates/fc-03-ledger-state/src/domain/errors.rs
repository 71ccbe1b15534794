//! # Ledger Errors

use thiserror::Error;

/// Errors from the key-value storage port.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KvStoreError {
    /// The namespace is not known to the backend.
    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    /// Backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Errors from ledger-state operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Storage backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] KvStoreError),

    /// A persisted record could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The message was already applied to this ledger.
    #[error("Message {0} already applied")]
    AlreadyApplied(String),

    /// The voter is not a federated server.
    #[error("Voter {0} is not a federated server")]
    NotFederated(String),

    /// Block completion for a height other than the current one.
    #[error("Stale height: ledger at {current}, message for {requested}")]
    StaleHeight { current: u64, requested: u64 },

    /// The action no longer applies to the authority set.
    #[error("Authority change rejected: {0}")]
    AuthorityConflict(String),
}

/// Convenience alias for ledger results.
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
