//! # RocksDB Storage Adapter
//!
//! Durable [`KeyValueStore`] for `storage.backend = "rocksdb"`.
//!
//! ## Column Families
//!
//! One per ledger namespace:
//!
//! - `directory_blocks` - head record
//! - `admin` - authority set
//!
//! ## Configuration
//!
//! - Snappy compression
//! - Bloom filters (10 bits per key)
//! - fsync on write unless `sync_writes` is off

use fc_03_ledger_state::{KeyValueStore, KvStoreError, NAMESPACES};
use rocksdb::{ColumnFamilyDescriptor, Options, WriteOptions, DB};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Database directory.
    pub path: PathBuf,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// fsync after each write (default: true)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/ledger"),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Small buffers, no fsync.
    pub fn for_testing(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

pub struct RocksDbStore {
    db: DB,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open or create the database with a column family per namespace.
    pub fn open(config: RocksDbConfig) -> Result<Self, KvStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = NAMESPACES
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(*name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors)
            .map_err(|e| KvStoreError::Backend(format!("Failed to open RocksDB: {e}")))?;

        Ok(Self { db, config })
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn cf(&self, namespace: &str) -> Result<&rocksdb::ColumnFamily, KvStoreError> {
        self.db
            .cf_handle(namespace)
            .ok_or_else(|| KvStoreError::UnknownNamespace(namespace.to_string()))
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, KvStoreError> {
        let cf = self.cf(namespace)?;
        self.db
            .get_cf(cf, key)
            .map_err(|e| KvStoreError::Backend(format!("RocksDB get failed: {e}")))
    }

    fn put(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<(), KvStoreError> {
        let cf = self.cf(namespace)?;
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db
            .put_cf_opt(cf, key, value, &write_opts)
            .map_err(|e| KvStoreError::Backend(format!("RocksDB put failed: {e}")))
    }
}
