//! Versioned projection store.
//!
//! Each row is kept as a short history of versions tagged with the block
//! range they are valid for. A write closes the current version and opens a
//! new one; two writes in the same block collapse into one version. Rolling
//! back to a block drops the versions opened after it and reopens the ones
//! that were closed after it, so reorgs never need to replay events.
//!
//! With a finality depth set, a write also drops the versions that were
//! superseded at or before `block - depth`. No rollback or as-of read at or
//! above that horizon can observe them, and every row keeps at most
//! `depth + 1` versions.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::projection::entities::{
    Adventurer, Battle, Beast, Discovery, Entity, Heist, Item, Listing,
};
use crate::storage::backend::{make_key, prefixes, BatchOperation, StorageBackend};

const CURSOR_KEY: &[u8] = b"cursor";

/// One version of a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version<E> {
    /// Block that wrote this version
    pub valid_from: u64,
    /// Block that replaced it, `None` while current
    pub valid_to: Option<u64>,
    /// Row contents
    pub row: E,
}

impl<E> Version<E> {
    /// Whether the version is visible at a validity condition
    pub fn is_visible(&self, validity: Validity) -> bool {
        match validity {
            Validity::Current => self.valid_to.is_none(),
            Validity::AsOf(block) => {
                self.valid_from <= block && self.valid_to.map_or(true, |to| to > block)
            }
        }
    }
}

/// Which version of each row a read observes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Validity {
    /// The open version of every row
    #[default]
    Current,
    /// The version that was current right after a block was applied.
    ///
    /// Blocks behind the finality horizon may miss compacted versions.
    AsOf(u64),
}

/// What a rollback removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackSummary {
    /// Versions dropped
    pub versions_removed: usize,
    /// Versions made current again
    pub versions_reopened: usize,
    /// Rows that no longer exist
    pub rows_deleted: usize,
}

impl std::ops::AddAssign for RollbackSummary {
    fn add_assign(&mut self, other: Self) {
        self.versions_removed += other.versions_removed;
        self.versions_reopened += other.versions_reopened;
        self.rows_deleted += other.rows_deleted;
    }
}

/// Projection store over a key-value backend
pub struct ProjectionStore<B: StorageBackend> {
    backend: B,
    finality_depth: Option<u64>,
}

impl<B: StorageBackend> ProjectionStore<B> {
    /// Wrap a backend, keeping every version
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            finality_depth: None,
        }
    }

    /// Compact versions superseded more than `depth` blocks behind each write
    pub fn with_finality_depth(mut self, depth: Option<u64>) -> Self {
        self.finality_depth = depth;
        self
    }

    /// Configured finality depth
    pub fn finality_depth(&self) -> Option<u64> {
        self.finality_depth
    }

    /// Oldest block still reachable once `head` has been written
    pub fn horizon(&self, head: u64) -> Option<u64> {
        self.finality_depth.map(|depth| head.saturating_sub(depth))
    }

    /// Underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn row_key<E: Entity>(key: &[u8]) -> Vec<u8> {
        make_key(E::COLLECTION.prefix(), key)
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value)
            .map_err(|e| Error::Serialization(format!("Failed to serialize value: {}", e)))
    }

    fn decode<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        bincode::deserialize(data)
            .map_err(|e| Error::Deserialization(format!("Failed to deserialize value: {}", e)))
    }

    /// Full version history of a row, oldest first
    pub fn history<E: Entity>(&self, key: &[u8]) -> Result<Vec<Version<E>>> {
        match self.backend.get(&Self::row_key::<E>(key))? {
            Some(data) => Self::decode(&data),
            None => Ok(Vec::new()),
        }
    }

    /// Current version of a row
    pub fn get_current<E: Entity>(&self, key: &[u8]) -> Result<Option<E>> {
        Ok(self
            .history::<E>(key)?
            .into_iter()
            .rev()
            .find(|v| v.valid_to.is_none())
            .map(|v| v.row))
    }

    /// Write a new current version of a row at a block
    pub fn put<E: Entity>(&self, block: u64, row: E) -> Result<()> {
        let key = row.key();
        let mut history = self.history::<E>(&key)?;

        let open_since = history
            .last()
            .filter(|v| v.valid_to.is_none())
            .map(|v| v.valid_from);

        match open_since {
            Some(from) if from == block => {
                if let Some(last) = history.last_mut() {
                    last.row = row;
                }
            }
            Some(from) if from > block => {
                return Err(Error::OutOfOrder {
                    cursor: from,
                    got: block,
                });
            }
            _ => {
                if let Some(last) = history.last_mut() {
                    if last.valid_to.is_none() {
                        last.valid_to = Some(block);
                    }
                }
                history.push(Version {
                    valid_from: block,
                    valid_to: None,
                    row,
                });

                if let Some(horizon) = self.horizon(block) {
                    history.retain(|v| v.valid_to.map_or(true, |to| to > horizon));
                }
            }
        }

        self.backend.write_batch(vec![BatchOperation::put(
            Self::row_key::<E>(&key),
            Self::encode(&history)?,
        )])
    }

    /// Rows visible at a validity condition, in key order
    pub fn scan<E: Entity>(&self, validity: Validity) -> Result<Vec<E>> {
        let mut rows = Vec::new();
        for (_, data) in self.backend.scan_prefix(E::COLLECTION.prefix())? {
            let history: Vec<Version<E>> = Self::decode(&data)?;
            if let Some(version) = history.into_iter().rev().find(|v| v.is_visible(validity)) {
                rows.push(version.row);
            }
        }
        Ok(rows)
    }

    /// Current rows, in key order
    pub fn scan_current<E: Entity>(&self) -> Result<Vec<E>> {
        self.scan(Validity::Current)
    }

    /// Number of current rows in a collection
    pub fn count_current<E: Entity>(&self) -> Result<usize> {
        Ok(self.scan_current::<E>()?.len())
    }

    /// Last block applied to the projection
    pub fn cursor(&self) -> Result<Option<u64>> {
        match self.backend.get(&make_key(prefixes::META, CURSOR_KEY))? {
            Some(data) => Self::decode(&data).map(Some),
            None => Ok(None),
        }
    }

    /// Record the last block applied
    pub fn set_cursor(&self, block: u64) -> Result<()> {
        self.backend
            .set(&make_key(prefixes::META, CURSOR_KEY), &Self::encode(&block)?)
    }

    fn rollback_ops<E: Entity>(
        &self,
        cursor: u64,
        ops: &mut Vec<BatchOperation>,
    ) -> Result<RollbackSummary> {
        let mut summary = RollbackSummary::default();

        for (key, data) in self.backend.scan_prefix(E::COLLECTION.prefix())? {
            let mut history: Vec<Version<E>> = Self::decode(&data)?;
            let before = history.len();

            history.retain(|v| v.valid_from <= cursor);
            let removed = before - history.len();

            let mut reopened = 0;
            for version in history.iter_mut() {
                if version.valid_to.map_or(false, |to| to > cursor) {
                    version.valid_to = None;
                    reopened += 1;
                }
            }

            if removed == 0 && reopened == 0 {
                continue;
            }

            summary.versions_removed += removed;
            summary.versions_reopened += reopened;

            if history.is_empty() {
                summary.rows_deleted += 1;
                ops.push(BatchOperation::delete(key));
            } else {
                ops.push(BatchOperation::put(key, Self::encode(&history)?));
            }
        }

        if summary != RollbackSummary::default() {
            debug!(collection = %E::COLLECTION, ?summary, "collection rolled back");
        }

        Ok(summary)
    }

    /// Undo every write made after `cursor`, across all collections.
    ///
    /// The whole rollback, including the cursor reset, is one batch. A target
    /// behind the finality horizon of the current cursor is refused.
    pub fn rollback_to(&self, cursor: u64) -> Result<RollbackSummary> {
        if let Some(horizon) = self.cursor()?.and_then(|head| self.horizon(head)) {
            if cursor < horizon {
                return Err(Error::RollbackPastFinality {
                    target: cursor,
                    horizon,
                });
            }
        }

        let mut ops = Vec::new();
        let mut summary = RollbackSummary::default();

        summary += self.rollback_ops::<Adventurer>(cursor, &mut ops)?;
        summary += self.rollback_ops::<Beast>(cursor, &mut ops)?;
        summary += self.rollback_ops::<Item>(cursor, &mut ops)?;
        summary += self.rollback_ops::<Listing>(cursor, &mut ops)?;
        summary += self.rollback_ops::<Discovery>(cursor, &mut ops)?;
        summary += self.rollback_ops::<Battle>(cursor, &mut ops)?;
        summary += self.rollback_ops::<Heist>(cursor, &mut ops)?;

        if self.cursor()?.map_or(false, |c| c > cursor) {
            ops.push(BatchOperation::put(
                make_key(prefixes::META, CURSOR_KEY),
                Self::encode(&cursor)?,
            ));
        }

        self.backend.write_batch(ops)?;

        info!(
            cursor,
            removed = summary.versions_removed,
            reopened = summary.versions_reopened,
            deleted = summary.rows_deleted,
            "projection rolled back"
        );

        Ok(summary)
    }

    /// Flush the backend
    pub fn flush(&self) -> Result<()> {
        self.backend.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::felt::Felt;
    use crate::storage::backend::MemoryBackend;

    fn adventurer(id: u64, gold: u64) -> Adventurer {
        let mut row = Adventurer::new(Felt::from_u64(id));
        row.gold = Some(Felt::from_u64(gold));
        row
    }

    fn key(id: u64) -> Vec<u8> {
        Felt::from_u64(id).as_bytes().to_vec()
    }

    #[test]
    fn test_put_and_get_current() {
        let store = ProjectionStore::new(MemoryBackend::new());
        assert!(store.get_current::<Adventurer>(&key(7)).unwrap().is_none());

        store.put(10, adventurer(7, 1)).unwrap();
        store.put(11, adventurer(7, 2)).unwrap();

        let current = store.get_current::<Adventurer>(&key(7)).unwrap().unwrap();
        assert_eq!(current.gold, Some(Felt::from_u64(2)));

        let history = store.history::<Adventurer>(&key(7)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].valid_to, Some(11));
        assert_eq!(history[1].valid_to, None);
    }

    #[test]
    fn test_same_block_writes_collapse() {
        let store = ProjectionStore::new(MemoryBackend::new());
        store.put(10, adventurer(7, 1)).unwrap();
        store.put(10, adventurer(7, 5)).unwrap();

        let history = store.history::<Adventurer>(&key(7)).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].row.gold, Some(Felt::from_u64(5)));
    }

    #[test]
    fn test_older_block_rejected() {
        let store = ProjectionStore::new(MemoryBackend::new());
        store.put(10, adventurer(7, 1)).unwrap();
        let err = store.put(9, adventurer(7, 2)).unwrap_err();
        assert_eq!(err, Error::OutOfOrder { cursor: 10, got: 9 });
    }

    #[test]
    fn test_rollback_restores_previous_version() {
        let store = ProjectionStore::new(MemoryBackend::new());
        store.put(10, adventurer(7, 1)).unwrap();
        store.put(12, adventurer(7, 2)).unwrap();
        store.put(12, adventurer(8, 9)).unwrap();
        store.set_cursor(12).unwrap();

        let summary = store.rollback_to(11).unwrap();
        assert_eq!(summary.versions_removed, 2);
        assert_eq!(summary.versions_reopened, 1);
        assert_eq!(summary.rows_deleted, 1);

        let current = store.get_current::<Adventurer>(&key(7)).unwrap().unwrap();
        assert_eq!(current.gold, Some(Felt::from_u64(1)));
        assert!(store.get_current::<Adventurer>(&key(8)).unwrap().is_none());
        assert_eq!(store.cursor().unwrap(), Some(11));
    }

    #[test]
    fn test_rollback_noop_at_head() {
        let store = ProjectionStore::new(MemoryBackend::new());
        store.put(10, adventurer(7, 1)).unwrap();
        assert_eq!(store.rollback_to(10).unwrap(), RollbackSummary::default());
        assert_eq!(store.count_current::<Adventurer>().unwrap(), 1);
    }

    #[test]
    fn test_history_bounded_by_finality_depth() {
        let store = ProjectionStore::new(MemoryBackend::new()).with_finality_depth(Some(8));
        for block in 1..=500u64 {
            store.put(block, adventurer(7, block)).unwrap();
            assert!(store.history::<Adventurer>(&key(7)).unwrap().len() <= 9);
        }
        store.set_cursor(500).unwrap();

        let history = store.history::<Adventurer>(&key(7)).unwrap();
        assert_eq!(history.len(), 9);
        assert_eq!(history[0].valid_from, 492);
        assert_eq!(history[0].valid_to, Some(493));

        let at_horizon = store.scan::<Adventurer>(Validity::AsOf(492)).unwrap();
        assert_eq!(at_horizon[0].gold, Some(Felt::from_u64(492)));

        let summary = store.rollback_to(492).unwrap();
        assert_eq!(summary.versions_removed, 8);
        let current = store.get_current::<Adventurer>(&key(7)).unwrap().unwrap();
        assert_eq!(current.gold, Some(Felt::from_u64(492)));
    }

    #[test]
    fn test_compaction_keeps_reachable_versions() {
        let store = ProjectionStore::new(MemoryBackend::new()).with_finality_depth(Some(2));
        store.put(1, adventurer(7, 1)).unwrap();
        store.put(1, adventurer(8, 1)).unwrap();
        store.put(50, adventurer(7, 2)).unwrap();

        // Still visible as of block 48
        assert_eq!(store.history::<Adventurer>(&key(7)).unwrap().len(), 2);

        store.put(60, adventurer(7, 3)).unwrap();
        let history = store.history::<Adventurer>(&key(7)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].valid_from, 50);

        let at_58 = store.scan::<Adventurer>(Validity::AsOf(58)).unwrap();
        assert_eq!(at_58.len(), 2);
        assert_eq!(at_58[0].gold, Some(Felt::from_u64(2)));
        assert_eq!(at_58[1].gold, Some(Felt::from_u64(1)));
    }

    #[test]
    fn test_rollback_past_horizon_refused() {
        let store = ProjectionStore::new(MemoryBackend::new()).with_finality_depth(Some(4));
        for block in 1..=10u64 {
            store.put(block, adventurer(7, block)).unwrap();
        }
        store.set_cursor(10).unwrap();

        let err = store.rollback_to(5).unwrap_err();
        assert_eq!(err, Error::RollbackPastFinality { target: 5, horizon: 6 });
        assert_eq!(store.cursor().unwrap(), Some(10));

        assert!(store.rollback_to(6).is_ok());
        let current = store.get_current::<Adventurer>(&key(7)).unwrap().unwrap();
        assert_eq!(current.gold, Some(Felt::from_u64(6)));
    }

    #[test]
    fn test_scan_as_of() {
        let store = ProjectionStore::new(MemoryBackend::new());
        store.put(10, adventurer(7, 1)).unwrap();
        store.put(20, adventurer(7, 2)).unwrap();
        store.put(15, adventurer(8, 3)).unwrap();

        let at_12 = store.scan::<Adventurer>(Validity::AsOf(12)).unwrap();
        assert_eq!(at_12.len(), 1);
        assert_eq!(at_12[0].gold, Some(Felt::from_u64(1)));

        let current = store.scan_current::<Adventurer>().unwrap();
        assert_eq!(current.len(), 2);
        assert_eq!(current[0].id, Felt::from_u64(7));
    }
}
