//! Key-value storage under the projection store.
//!
//! ## Backends
//!
//! - **MemoryBackend**: ordered in-process map, for tests
//! - **SnapshotBackend**: bincode snapshot file, for small local runs
//! - **RocksBackend**: RocksDB, behind the `rocksdb-storage` feature
//!
//! [`open_backend`] picks one from an [`IndexerConfig`].

pub mod backend;
pub mod rocks;

pub use backend::*;
pub use rocks::{RocksBackend, RocksConfig};

use crate::core::config::{IndexerConfig, StorageKind};
use crate::error::Result;

/// Open the backend selected by the configuration
pub fn open_backend(config: &IndexerConfig) -> Result<Box<dyn StorageBackend>> {
    let backend: Box<dyn StorageBackend> = match config.storage {
        StorageKind::Memory => Box::new(MemoryBackend::new()),
        StorageKind::Snapshot => Box::new(SnapshotBackend::open(&config.data_dir)?),
        StorageKind::Rocks => open_rocks(config)?,
    };
    Ok(backend)
}

#[cfg(feature = "rocksdb-storage")]
fn open_rocks(config: &IndexerConfig) -> Result<Box<dyn StorageBackend>> {
    Ok(Box::new(RocksBackend::open_default(config.data_dir.join("rocks"))?))
}

#[cfg(not(feature = "rocksdb-storage"))]
fn open_rocks(_config: &IndexerConfig) -> Result<Box<dyn StorageBackend>> {
    Err(crate::error::Error::Storage(
        "RocksDB feature not enabled. Rebuild with --features rocksdb-storage".into(),
    ))
}
