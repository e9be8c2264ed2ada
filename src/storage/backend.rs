//! Storage backend implementations.
//!
//! This module provides the key-value layer under the projection store:
//! - MemoryBackend: ordered in-process map, for tests and ephemeral runs
//! - SnapshotBackend: ordered map persisted as a bincode snapshot file
//!
//! Every backend returns prefix scans in ascending key order and applies a
//! batch as a unit.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Key type for storage operations
pub type StorageKey = Vec<u8>;

/// Value type for storage operations
pub type StorageValue = Vec<u8>;

/// Trait for storage backends
pub trait StorageBackend: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>>;

    /// Set a value for a key
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key
    fn delete(&self, key: &[u8]) -> Result<bool>;

    /// Check if a key exists
    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// All entries under a prefix, in ascending key order
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(StorageKey, StorageValue)>>;

    /// Apply a group of writes atomically
    fn write_batch(&self, operations: Vec<BatchOperation>) -> Result<()>;

    /// Flush any pending writes to persistent storage
    fn flush(&self) -> Result<()>;

    /// Clear all data
    fn clear(&self) -> Result<()>;
}

/// A single write inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair
    Put {
        /// Key
        key: StorageKey,
        /// Value
        value: StorageValue,
    },
    /// Delete a key
    Delete {
        /// Key
        key: StorageKey,
    },
}

impl BatchOperation {
    /// Create a put operation
    pub fn put(key: impl Into<StorageKey>, value: impl Into<StorageValue>) -> Self {
        Self::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a delete operation
    pub fn delete(key: impl Into<StorageKey>) -> Self {
        Self::Delete { key: key.into() }
    }

    fn apply_to(self, map: &mut BTreeMap<StorageKey, StorageValue>) {
        match self {
            BatchOperation::Put { key, value } => {
                map.insert(key, value);
            }
            BatchOperation::Delete { key } => {
                map.remove(&key);
            }
        }
    }
}

fn scan(
    map: &BTreeMap<StorageKey, StorageValue>,
    prefix: &[u8],
) -> Vec<(StorageKey, StorageValue)> {
    map.range(prefix.to_vec()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory storage backend (for testing and ephemeral use)
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<BTreeMap<StorageKey, StorageValue>>,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of entries
    pub fn len(&self) -> Result<usize> {
        Ok(self.data.read().map_err(|_| Error::Lock)?.len())
    }

    /// Check if empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        let data = self.data.read().map_err(|_| Error::Lock)?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut data = self.data.write().map_err(|_| Error::Lock)?;
        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut data = self.data.write().map_err(|_| Error::Lock)?;
        Ok(data.remove(key).is_some())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(StorageKey, StorageValue)>> {
        let data = self.data.read().map_err(|_| Error::Lock)?;
        Ok(scan(&data, prefix))
    }

    fn write_batch(&self, operations: Vec<BatchOperation>) -> Result<()> {
        let mut data = self.data.write().map_err(|_| Error::Lock)?;
        for op in operations {
            op.apply_to(&mut data);
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut data = self.data.write().map_err(|_| Error::Lock)?;
        data.clear();
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOT BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

/// File name of the snapshot inside the data directory
pub const SNAPSHOT_FILE: &str = "projection.bin";

/// Ordered map persisted as a single bincode snapshot.
///
/// Writes land in memory and mark the snapshot dirty; `flush` (and drop)
/// rewrite the file through a temporary sibling and a rename.
#[derive(Debug)]
pub struct SnapshotBackend {
    base_path: PathBuf,
    cache: RwLock<BTreeMap<StorageKey, StorageValue>>,
    dirty: RwLock<bool>,
}

impl SnapshotBackend {
    /// Open or create a snapshot in the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                Error::Storage(format!("Failed to create storage directory: {}", e))
            })?;
        }

        let store = Self {
            base_path,
            cache: RwLock::new(BTreeMap::new()),
            dirty: RwLock::new(false),
        };

        store.load_from_disk()?;

        Ok(store)
    }

    /// Path of the snapshot file
    pub fn snapshot_path(&self) -> PathBuf {
        self.base_path.join(SNAPSHOT_FILE)
    }

    fn mark_dirty(&self) -> Result<()> {
        *self.dirty.write().map_err(|_| Error::Lock)? = true;
        Ok(())
    }

    fn load_from_disk(&self) -> Result<()> {
        let path = self.snapshot_path();

        if !path.exists() {
            return Ok(());
        }

        let mut file = File::open(&path)
            .map_err(|e| Error::Storage(format!("Failed to open snapshot: {}", e)))?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| Error::Storage(format!("Failed to read snapshot: {}", e)))?;

        let loaded: BTreeMap<StorageKey, StorageValue> = bincode::deserialize(&data)
            .map_err(|e| Error::Deserialization(format!("Corrupt snapshot: {}", e)))?;

        *self.cache.write().map_err(|_| Error::Lock)? = loaded;

        Ok(())
    }

    fn save_to_disk(&self) -> Result<()> {
        let cache = self.cache.read().map_err(|_| Error::Lock)?;

        let data = bincode::serialize(&*cache)
            .map_err(|e| Error::Serialization(format!("Failed to encode snapshot: {}", e)))?;

        let path = self.snapshot_path();
        let tmp = path.with_extension("bin.tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| Error::Storage(format!("Failed to open snapshot: {}", e)))?;

        file.write_all(&data)
            .and_then(|_| file.sync_all())
            .map_err(|e| Error::Storage(format!("Failed to write snapshot: {}", e)))?;

        fs::rename(&tmp, &path)
            .map_err(|e| Error::Storage(format!("Failed to replace snapshot: {}", e)))?;

        *self.dirty.write().map_err(|_| Error::Lock)? = false;

        Ok(())
    }
}

impl StorageBackend for SnapshotBackend {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        let cache = self.cache.read().map_err(|_| Error::Lock)?;
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.cache
            .write()
            .map_err(|_| Error::Lock)?
            .insert(key.to_vec(), value.to_vec());
        self.mark_dirty()
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let existed = self
            .cache
            .write()
            .map_err(|_| Error::Lock)?
            .remove(key)
            .is_some();

        if existed {
            self.mark_dirty()?;
        }

        Ok(existed)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(StorageKey, StorageValue)>> {
        let cache = self.cache.read().map_err(|_| Error::Lock)?;
        Ok(scan(&cache, prefix))
    }

    fn write_batch(&self, operations: Vec<BatchOperation>) -> Result<()> {
        {
            let mut cache = self.cache.write().map_err(|_| Error::Lock)?;
            for op in operations {
                op.apply_to(&mut cache);
            }
        }
        self.mark_dirty()
    }

    fn flush(&self) -> Result<()> {
        let dirty = *self.dirty.read().map_err(|_| Error::Lock)?;
        if dirty {
            self.save_to_disk()?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.cache.write().map_err(|_| Error::Lock)?.clear();
        self.mark_dirty()
    }
}

impl Drop for SnapshotBackend {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        (**self).get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        (**self).delete(key)
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        (**self).exists(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(StorageKey, StorageValue)>> {
        (**self).scan_prefix(prefix)
    }

    fn write_batch(&self, operations: Vec<BatchOperation>) -> Result<()> {
        (**self).write_batch(operations)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY PREFIXES
// ═══════════════════════════════════════════════════════════════════════════════

/// Key prefixes, one per collection
pub mod prefixes {
    /// Adventurers
    pub const ADVENTURERS: &[u8] = b"adv:";
    /// Beasts
    pub const BEASTS: &[u8] = b"bst:";
    /// Items
    pub const ITEMS: &[u8] = b"itm:";
    /// Market listings
    pub const TOKENS: &[u8] = b"tok:";
    /// Discovery log
    pub const DISCOVERIES: &[u8] = b"dsc:";
    /// Battles
    pub const BATTLES: &[u8] = b"btl:";
    /// Heists
    pub const HEISTS: &[u8] = b"hst:";
    /// Indexer metadata
    pub const META: &[u8] = b"meta:";
}

/// Create a key with a prefix
pub fn make_key(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(prefix.len() + key.len());
    result.extend_from_slice(prefix);
    result.extend_from_slice(key);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend() {
        let store = MemoryBackend::new();

        store.set(b"key1", b"value1").unwrap();
        assert_eq!(store.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get(b"nonexistent").unwrap(), None);

        assert!(store.exists(b"key1").unwrap());
        assert!(store.delete(b"key1").unwrap());
        assert!(!store.exists(b"key1").unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_scan_prefix_is_ordered() {
        let store = MemoryBackend::new();

        store.set(b"adv:\x02", b"b").unwrap();
        store.set(b"adv:\x01", b"a").unwrap();
        store.set(b"bst:\x01", b"x").unwrap();
        store.set(b"adu", b"y").unwrap();

        let rows = store.scan_prefix(prefixes::ADVENTURERS).unwrap();
        let values: Vec<_> = rows.into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_write_batch() {
        let store = MemoryBackend::new();
        store.set(b"gone", b"1").unwrap();

        store
            .write_batch(vec![
                BatchOperation::put(b"k1".to_vec(), b"v1".to_vec()),
                BatchOperation::put(b"k2".to_vec(), b"v2".to_vec()),
                BatchOperation::delete(b"gone".to_vec()),
            ])
            .unwrap();

        assert_eq!(store.len().unwrap(), 2);
        assert!(!store.exists(b"gone").unwrap());
    }

    #[test]
    fn test_make_key() {
        let key = make_key(prefixes::BEASTS, &[0u8; 32]);
        assert!(key.starts_with(b"bst:"));
        assert_eq!(key.len(), 4 + 32);
    }

    #[test]
    fn test_snapshot_persistence() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().to_path_buf();

        {
            let store = SnapshotBackend::open(&path).unwrap();
            store.set(b"persistent", b"data").unwrap();
            store.flush().unwrap();
            assert!(store.snapshot_path().exists());
        }

        {
            let store = SnapshotBackend::open(&path).unwrap();
            assert_eq!(store.get(b"persistent").unwrap(), Some(b"data".to_vec()));
        }
    }

    #[test]
    fn test_snapshot_flushes_on_drop() {
        let temp_dir = tempfile::tempdir().unwrap();

        {
            let store = SnapshotBackend::open(temp_dir.path()).unwrap();
            store
                .write_batch(vec![BatchOperation::put(b"k".to_vec(), b"v".to_vec())])
                .unwrap();
        }

        let store = SnapshotBackend::open(temp_dir.path()).unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_corrupt_snapshot_is_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(SNAPSHOT_FILE), b"\xff\xff\xff").unwrap();

        let err = SnapshotBackend::open(temp_dir.path()).unwrap_err();
        assert!(err.is_storage_error());
    }
}
