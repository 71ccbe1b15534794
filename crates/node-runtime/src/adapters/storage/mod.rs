//! # Storage Adapters
//!
//! Picks the ledger's [`KeyValueStore`] from `storage.backend`.
//!
//! ## Usage
//!
//! Enable the `rocksdb` feature for durable storage:
//!
//! ```toml
//! node-runtime = { path = "...", features = ["rocksdb"] }
//! ```

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

use crate::container::config::{StorageBackend, StorageConfig};
use fc_03_ledger_state::{InMemoryStore, KeyValueStore, KvStoreError};
use std::sync::Arc;
use tracing::info;

/// Open the configured backend.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, KvStoreError> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory ledger storage; state is lost on exit");
            Ok(Arc::new(InMemoryStore::new()))
        }
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => {
            let path = config.data_dir.join("ledger");
            info!(path = %path.display(), "Opening RocksDB ledger storage");
            Ok(Arc::new(RocksDbStore::open(RocksDbConfig::at(path))?))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::Rocksdb => Err(KvStoreError::Backend(
            "built without the `rocksdb` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend() {
        let store = open_store(&StorageConfig::default()).unwrap();
        store.put("admin", b"k", b"v").unwrap();
        assert_eq!(store.get("admin", b"k").unwrap(), Some(b"v".to_vec()));
    }
}
