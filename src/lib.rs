//! # Survivor Indexer
//!
//! Projects the event stream of an on-chain adventure game into queryable
//! entity collections: adventurers, beasts, items, market listings,
//! discoveries, battles and heists.
//!
//! ## Architecture
//!
//! - **Core**: field element codec, enumeration tables, configuration
//! - **Events**: closed set of event kinds and pure payload decoding
//! - **Projection**: versioned entity rows and the single-writer projector
//! - **Query**: filter trees, compilation, sorting and typed results
//! - **Storage**: key-value backends (memory, snapshot file, RocksDB)
//! - **Indexer**: the decode and project pipeline over incoming blocks
//!
//! Writes flow one way: raw event, decoded record, projected row. Reads never
//! write. Every row keeps the block range each of its versions was valid
//! for, so a chain reorganisation rolls the projection back instead of
//! halting it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use survivor_indexer::prelude::*;
//!
//! let config = IndexerConfig::from_env()?;
//! let mut indexer = Indexer::new(config, MemoryBackend::new());
//! indexer.handle_block(&block)?;
//!
//! let executor = QueryExecutor::new(indexer.store(), &indexer.config().tables);
//! let rows = executor.run_json(Collection::Adventurers, r#"{"where": {"id": {"eq": 7}}}"#)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod core;
pub mod error;
pub mod events;
pub mod indexer;
pub mod projection;
pub mod query;
pub mod storage;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::{ContractAddresses, IndexerConfig, Network, StorageKind},
        felt::Felt,
        tables::EnumTables,
    };
    pub use crate::error::{Error, Result};
    pub use crate::events::{decode, DecodedEvent, EventKind};
    pub use crate::indexer::{Block, Indexer, IndexerStatistics, RawEvent};
    pub use crate::projection::{
        Collection, Entity, EventContext, ProjectionStore, Projector, Validity,
    };
    pub use crate::query::{QueryError, QueryExecutor, QueryInput, SortSpec};
    pub use crate::storage::{MemoryBackend, SnapshotBackend, StorageBackend};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
