//! Core building blocks shared by the write and read sides:
//! - Field element codec (integers, short ASCII strings, hex literals)
//! - Enumeration tables mapping contract codes to display labels
//! - Indexer configuration

pub mod config;
pub mod felt;
pub mod tables;

pub use config::{ConfigError, ContractAddresses, IndexerConfig, Network, StorageKind};
pub use felt::{decode_ascii, decode_int, encode_ascii, encode_int, Felt};
pub use tables::{label_for, lookup_by_value, EnumTable, EnumTables, TableId, UNKNOWN_LABEL};
