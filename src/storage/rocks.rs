//! RocksDB storage backend for persistent projections.
//!
//! All collections share the default column family; the collection prefix
//! keeps them apart and RocksDB's sorted keyspace turns a prefix scan into a
//! single forward seek.
//!
//! ```rust,ignore
//! use survivor_indexer::storage::rocks::{RocksBackend, RocksConfig};
//!
//! let backend = RocksBackend::open("/var/lib/survivor/db", RocksConfig::default())?;
//! ```

#[cfg(feature = "rocksdb-storage")]
use rocksdb::{IteratorMode, Options, WriteBatch, DB};

use std::path::Path;
#[cfg(feature = "rocksdb-storage")]
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
#[cfg(feature = "rocksdb-storage")]
use crate::storage::backend::{BatchOperation, StorageBackend, StorageKey, StorageValue};

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration for RocksDB storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksConfig {
    /// Create database if it doesn't exist
    pub create_if_missing: bool,
    /// Maximum number of open files
    pub max_open_files: i32,
    /// Write buffer size in bytes
    pub write_buffer_size: usize,
    /// Maximum number of write buffers
    pub max_write_buffer_number: i32,
    /// Enable LZ4 compression
    pub enable_compression: bool,
    /// Bloom filter bits per key, 0 to disable
    pub bloom_bits_per_key: f64,
}

impl Default for RocksConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            max_open_files: 256,
            write_buffer_size: 32 * 1024 * 1024, // 32 MB
            max_write_buffer_number: 3,
            enable_compression: true,
            bloom_bits_per_key: 10.0,
        }
    }
}

impl RocksConfig {
    /// Create a configuration for low memory environments
    pub fn low_memory() -> Self {
        Self {
            max_open_files: 64,
            write_buffer_size: 8 * 1024 * 1024, // 8 MB
            max_write_buffer_number: 2,
            ..Default::default()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROCKSDB BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

/// RocksDB storage backend
#[cfg(feature = "rocksdb-storage")]
pub struct RocksBackend {
    db: DB,
    path: PathBuf,
}

#[cfg(feature = "rocksdb-storage")]
impl RocksBackend {
    /// Open a RocksDB database
    pub fn open<P: AsRef<Path>>(path: P, config: RocksConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);

        if config.enable_compression {
            opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        }

        if config.bloom_bits_per_key > 0.0 {
            let mut block_opts = rocksdb::BlockBasedOptions::default();
            block_opts.set_bloom_filter(config.bloom_bits_per_key, false);
            opts.set_block_based_table_factory(&block_opts);
        }

        let db = DB::open(&opts, &path)
            .map_err(|e| Error::Storage(format!("Failed to open RocksDB: {}", e)))?;

        Ok(Self { db, path })
    }

    /// Open with default configuration
    pub fn open_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path, RocksConfig::default())
    }

    /// Get database path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compact the whole keyspace
    pub fn compact(&self) {
        self.db.compact_range(None::<&[u8]>, None::<&[u8]>);
    }
}

#[cfg(feature = "rocksdb-storage")]
impl StorageBackend for RocksBackend {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        self.db
            .get(key)
            .map_err(|e| Error::Storage(format!("RocksDB get error: {}", e)))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db
            .put(key, value)
            .map_err(|e| Error::Storage(format!("RocksDB put error: {}", e)))
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let exists = self.exists(key)?;

        if exists {
            self.db
                .delete(key)
                .map_err(|e| Error::Storage(format!("RocksDB delete error: {}", e)))?;
        }

        Ok(exists)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(StorageKey, StorageValue)>> {
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));

        let mut entries = Vec::new();
        for item in iter {
            let (key, value) =
                item.map_err(|e| Error::Storage(format!("RocksDB iterator error: {}", e)))?;

            if !key.starts_with(prefix) {
                break;
            }

            entries.push((key.to_vec(), value.to_vec()));
        }

        Ok(entries)
    }

    fn write_batch(&self, operations: Vec<BatchOperation>) -> Result<()> {
        let mut batch = WriteBatch::default();

        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put(&key, &value),
                BatchOperation::Delete { key } => batch.delete(&key),
            }
        }

        self.db
            .write(batch)
            .map_err(|e| Error::Storage(format!("RocksDB batch write error: {}", e)))
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| Error::Storage(format!("RocksDB flush error: {}", e)))
    }

    fn clear(&self) -> Result<()> {
        let mut batch = WriteBatch::default();
        for item in self.db.iterator(IteratorMode::Start) {
            let (key, _) =
                item.map_err(|e| Error::Storage(format!("RocksDB iterator error: {}", e)))?;
            batch.delete(&key);
        }
        self.db
            .write(batch)
            .map_err(|e| Error::Storage(format!("RocksDB batch write error: {}", e)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STUB IMPLEMENTATION (WHEN FEATURE DISABLED)
// ═══════════════════════════════════════════════════════════════════════════════

/// Stub implementation when RocksDB feature is disabled
#[cfg(not(feature = "rocksdb-storage"))]
pub struct RocksBackend;

#[cfg(not(feature = "rocksdb-storage"))]
impl RocksBackend {
    /// Open (stub)
    pub fn open<P: AsRef<Path>>(_path: P, _config: RocksConfig) -> Result<Self> {
        Err(Error::Storage(
            "RocksDB feature not enabled. Rebuild with --features rocksdb-storage".into(),
        ))
    }

    /// Open with default config (stub)
    pub fn open_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path, RocksConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_low_memory() {
        let config = RocksConfig::low_memory();
        assert!(config.write_buffer_size < RocksConfig::default().write_buffer_size);
        assert!(config.create_if_missing);
    }

    #[cfg(not(feature = "rocksdb-storage"))]
    #[test]
    fn test_stub_reports_missing_feature() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = RocksBackend::open_default(temp_dir.path()).err().unwrap();
        assert!(err.is_storage_error());
    }

    #[cfg(feature = "rocksdb-storage")]
    #[test]
    fn test_rocks_backend_scan_and_batch() {
        use crate::storage::backend::{prefixes, BatchOperation, StorageBackend};

        let temp_dir = tempfile::tempdir().unwrap();
        let store = RocksBackend::open_default(temp_dir.path()).unwrap();

        store
            .write_batch(vec![
                BatchOperation::put(b"adv:\x02".to_vec(), b"b".to_vec()),
                BatchOperation::put(b"adv:\x01".to_vec(), b"a".to_vec()),
                BatchOperation::put(b"bst:\x01".to_vec(), b"x".to_vec()),
            ])
            .unwrap();

        let rows = store.scan_prefix(prefixes::ADVENTURERS).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, b"a".to_vec());

        assert!(store.delete(b"adv:\x01").unwrap());
        assert!(!store.exists(b"adv:\x01").unwrap());
    }
}
