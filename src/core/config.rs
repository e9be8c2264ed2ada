//! Indexer configuration.
//!
//! Configuration is a plain value: loaded from JSON, optionally overridden
//! from `SURVIVOR_*` environment variables, validated once and then passed by
//! reference to the components that need it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::felt::Felt;
use crate::core::tables::EnumTables;

/// Deployment block of the default contracts, on Goerli
pub const DEFAULT_STARTING_BLOCK: u64 = 785_000;

/// Blocks behind the head after which superseded row versions are dropped
pub const DEFAULT_FINALITY_DEPTH: u64 = 64;

/// Page size used when a query does not specify a limit
pub const DEFAULT_QUERY_LIMIT: usize = 10;

const ADVENTURER_CONTRACT: &str =
    "0x035d755a23ec72df90819f584d9a1849bbc21fa77f96d25e03f1736883895248";
const BEAST_CONTRACT: &str = "0x000f4dbfe5d15792aa91025e42ee1d74c22bdeb1eef0b9bc19a37216377290c1";
const LOOT_CONTRACT: &str = "0x065669e15c8f1a7f17b7062e4eb1b709b922b931b93c59577f1848a85c30ab1f";

// ═══════════════════════════════════════════════════════════════════════════════
// INDEXER CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Indexer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Network the contracts are deployed on
    pub network: Network,
    /// Addresses of the emitting contracts
    pub contracts: ContractAddresses,
    /// Blocks below this number are ignored
    pub starting_block: u64,
    /// Directory for file-backed storage
    pub data_dir: PathBuf,
    /// Storage backend
    pub storage: StorageKind,
    /// Page size when the caller does not pass a limit
    pub default_limit: usize,
    /// How far back rollbacks and as-of reads can reach; `None` keeps every
    /// version forever
    pub finality_depth: Option<u64>,
    /// Enumeration tables, always the published defaults
    #[serde(skip)]
    pub tables: EnumTables,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            network: Network::Goerli,
            contracts: ContractAddresses::default(),
            starting_block: DEFAULT_STARTING_BLOCK,
            data_dir: default_data_dir(),
            storage: StorageKind::Memory,
            default_limit: DEFAULT_QUERY_LIMIT,
            finality_depth: Some(DEFAULT_FINALITY_DEPTH),
            tables: EnumTables::default(),
        }
    }
}

impl IndexerConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Defaults overridden from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `SURVIVOR_*` overrides from a variable lookup
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(network) = lookup("SURVIVOR_NETWORK") {
            self.network = network.parse()?;
        }

        if let Some(dir) = lookup("SURVIVOR_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(storage) = lookup("SURVIVOR_STORAGE") {
            self.storage = storage.parse()?;
        }

        if let Some(block) = lookup("SURVIVOR_STARTING_BLOCK") {
            self.starting_block = block
                .parse()
                .map_err(|_| ConfigError::Validation(format!("Invalid starting block: {}", block)))?;
        }

        if let Some(limit) = lookup("SURVIVOR_DEFAULT_LIMIT") {
            self.default_limit = limit
                .parse()
                .map_err(|_| ConfigError::Validation(format!("Invalid default limit: {}", limit)))?;
        }

        if let Some(depth) = lookup("SURVIVOR_FINALITY_DEPTH") {
            self.finality_depth = match depth.as_str() {
                "none" | "" => None,
                _ => Some(depth.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid finality depth: {}", depth))
                })?),
            };
        }

        for (var, slot) in [
            ("SURVIVOR_ADVENTURER_CONTRACT", &mut self.contracts.adventurer),
            ("SURVIVOR_BEAST_CONTRACT", &mut self.contracts.beast),
            ("SURVIVOR_LOOT_CONTRACT", &mut self.contracts.loot),
        ] {
            if let Some(address) = lookup(var) {
                *slot = Felt::from_hex(&address)
                    .map_err(|e| ConfigError::Validation(format!("{}: {}", var, e)))?;
            }
        }

        Ok(())
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        default_data_dir().join("config.json")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ContractAddresses { adventurer, beast, loot } = &self.contracts;

        if adventurer.is_zero() || beast.is_zero() || loot.is_zero() {
            return Err(ConfigError::Validation("Contract addresses cannot be zero".into()));
        }

        if adventurer == beast || adventurer == loot || beast == loot {
            return Err(ConfigError::Validation("Contract addresses must be distinct".into()));
        }

        if self.default_limit == 0 {
            return Err(ConfigError::Validation("Default limit must be greater than 0".into()));
        }

        if self.storage.is_persistent() && self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "Data directory is required for persistent storage".into(),
            ));
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTRACTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Addresses of the three game contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// Emits adventurer, discovery, thief and gold events
    pub adventurer: Felt,
    /// Emits beast lifecycle and combat events
    pub beast: Felt,
    /// Emits item and market events
    pub loot: Felt,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        // The literals are well-formed field elements; zero only on a typo,
        // which validate() reports.
        let parse = |hex: &str| Felt::from_hex(hex).unwrap_or(Felt::ZERO);
        Self {
            adventurer: parse(ADVENTURER_CONTRACT),
            beast: parse(BEAST_CONTRACT),
            loot: parse(LOOT_CONTRACT),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NETWORK
// ═══════════════════════════════════════════════════════════════════════════════

/// Network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Starknet mainnet
    Mainnet,
    /// Starknet Goerli testnet
    Goerli,
    /// Local devnet
    Devnet,
}

impl Network {
    /// Get network name
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Goerli => "goerli",
            Network::Devnet => "devnet",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "goerli" | "testnet" => Ok(Network::Goerli),
            "devnet" | "local" => Ok(Network::Devnet),
            _ => Err(ConfigError::Validation(format!("Unknown network: {}", s))),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE KIND
// ═══════════════════════════════════════════════════════════════════════════════

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// In-process, lost on exit
    Memory,
    /// Bincode snapshot file in the data directory
    Snapshot,
    /// RocksDB database in the data directory
    Rocks,
}

impl StorageKind {
    /// Whether the backend writes to the data directory
    pub fn is_persistent(&self) -> bool {
        !matches!(self, StorageKind::Memory)
    }
}

impl std::str::FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Ok(StorageKind::Memory),
            "snapshot" | "file" => Ok(StorageKind::Snapshot),
            "rocks" | "rocksdb" => Ok(StorageKind::Rocks),
            _ => Err(ConfigError::Validation(format!("Unknown storage backend: {}", s))),
        }
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StorageKind::Memory => "memory",
            StorageKind::Snapshot => "snapshot",
            StorageKind::Rocks => "rocks",
        };
        f.write_str(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

fn default_data_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".survivor"),
        Err(_) => PathBuf::from(".survivor"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = IndexerConfig::default();
        assert_eq!(config.network, Network::Goerli);
        assert_eq!(config.starting_block, 785_000);
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.finality_depth, Some(DEFAULT_FINALITY_DEPTH));
        assert!(config.validate().is_ok());
        assert_eq!(config.tables.races.label(1), Some("Elf"));
    }

    #[test]
    fn test_contract_defaults() {
        let contracts = ContractAddresses::default();
        assert!(!contracts.adventurer.is_zero());
        assert_eq!(contracts.beast.to_hex(), BEAST_CONTRACT);
    }

    #[test]
    fn test_network_parsing() {
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("GOERLI".parse::<Network>().unwrap(), Network::Goerli);
        assert!("sepolia".parse::<Network>().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SURVIVOR_NETWORK", "mainnet"),
            ("SURVIVOR_STORAGE", "snapshot"),
            ("SURVIVOR_STARTING_BLOCK", "800000"),
            ("SURVIVOR_LOOT_CONTRACT", "0x1234"),
            ("SURVIVOR_FINALITY_DEPTH", "128"),
        ]
        .into_iter()
        .collect();

        let mut config = IndexerConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.storage, StorageKind::Snapshot);
        assert_eq!(config.starting_block, 800_000);
        assert_eq!(config.contracts.loot, Felt::from_u64(0x1234));
        assert_eq!(config.finality_depth, Some(128));

        config
            .apply_overrides(|name| (name == "SURVIVOR_FINALITY_DEPTH").then(|| "none".to_string()))
            .unwrap();
        assert_eq!(config.finality_depth, None);
    }

    #[test]
    fn test_bad_override_rejected() {
        let mut config = IndexerConfig::default();
        let result = config.apply_overrides(|name| {
            (name == "SURVIVOR_STARTING_BLOCK").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_shared_address() {
        let mut config = IndexerConfig::default();
        config.contracts.loot = config.contracts.beast;
        assert!(config.validate().is_err());

        let mut config = IndexerConfig::default();
        config.default_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = IndexerConfig::default();
        config.starting_block = 1;
        config.save(&path).unwrap();

        let loaded = IndexerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
