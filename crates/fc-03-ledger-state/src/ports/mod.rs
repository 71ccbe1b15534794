//! # Outbound Ports (Driven Ports / SPI)
//!
//! Persistent key-value storage consumed by the ledger.
//!
//! Production: `RocksDbStore` in node-runtime/adapters/storage
//! Testing: [`crate::adapters::InMemoryStore`]

use crate::domain::KvStoreError;

/// Namespace holding the directory-block head record.
pub const NS_DIRECTORY_BLOCKS: &str = "directory_blocks";

/// Namespace holding the authority set.
pub const NS_ADMIN: &str = "admin";

/// Every namespace the ledger writes to.
pub const NAMESPACES: [&str; 2] = [NS_DIRECTORY_BLOCKS, NS_ADMIN];

/// Key of the head record in [`NS_DIRECTORY_BLOCKS`].
pub const KEY_HEAD: &[u8] = b"head";

/// Key of the authority set in [`NS_ADMIN`].
pub const KEY_AUTHORITIES: &[u8] = b"authorities";

/// Namespaced key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Get a record.
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, KvStoreError>;

    /// Put a record, replacing any previous value.
    fn put(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<(), KvStoreError>;
}
