//! # In-Memory Store
//!
//! Volatile [`KeyValueStore`] for tests and `storage.backend = "memory"`.

use crate::domain::KvStoreError;
use crate::ports::KeyValueStore;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<(String, Vec<u8>), Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all namespaces.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, KvStoreError> {
        Ok(self
            .data
            .read()
            .get(&(namespace.to_string(), key.to_vec()))
            .cloned())
    }

    fn put(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<(), KvStoreError> {
        self.data
            .write()
            .insert((namespace.to_string(), key.to_vec()), value.to_vec());
        Ok(())
    }
}
