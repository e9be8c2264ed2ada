//! Indexing pipeline.
//!
//! Blocks arrive in order from an external stream. For every raw event the
//! indexer resolves the kind from its selector, checks the emitting contract,
//! decodes the payload and hands the record to the projector. A bad event is
//! logged and counted; it never aborts the block. Only storage failures do.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::config::IndexerConfig;
use crate::core::felt::Felt;
use crate::error::{Error, Result};
use crate::events::{decode, EventKind};
use crate::projection::projector::{EventContext, Projector};
use crate::projection::store::{ProjectionStore, RollbackSummary};
use crate::storage::backend::StorageBackend;

// ═══════════════════════════════════════════════════════════════════════════════
// INPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// An undecoded contract event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Emitting contract
    pub from_address: Felt,
    /// First key of the event
    pub selector: Felt,
    /// Payload
    #[serde(default)]
    pub data: Vec<Felt>,
    /// Emitting transaction
    pub tx_hash: Felt,
}

/// A block of events, in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block number
    pub number: u64,
    /// Block timestamp, unix seconds
    pub timestamp: u64,
    /// Events
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATISTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Counters kept by the indexer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerStatistics {
    /// Blocks applied
    pub blocks_applied: u64,
    /// Blocks ignored because they precede the starting block
    pub blocks_skipped: u64,
    /// Events applied to the projection
    pub events_applied: u64,
    /// Applied events by kind name
    pub events_by_kind: BTreeMap<String, u64>,
    /// Events with a selector outside the known set
    pub unknown_selectors: u64,
    /// Known events emitted by an unexpected contract
    pub foreign_events: u64,
    /// Events whose payload failed to decode
    pub decode_errors: u64,
    /// Events rejected as data-integrity violations
    pub integrity_violations: u64,
    /// Rollbacks performed
    pub rollbacks: u64,
    /// Last block applied
    pub latest_block: Option<u64>,
}

/// Effect of one block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    /// Events applied
    pub applied: usize,
    /// Events skipped or rejected
    pub rejected: usize,
    /// Whether the block was ignored altogether
    pub skipped: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// INDEXER
// ═══════════════════════════════════════════════════════════════════════════════

/// Decode and project pipeline
pub struct Indexer<B: StorageBackend> {
    config: IndexerConfig,
    projector: Projector<B>,
    stats: IndexerStatistics,
    start_time: Instant,
}

impl<B: StorageBackend> Indexer<B> {
    /// Create an indexer over a backend
    pub fn new(config: IndexerConfig, backend: B) -> Self {
        let store = ProjectionStore::new(backend).with_finality_depth(config.finality_depth);
        Self {
            config,
            projector: Projector::new(store),
            stats: IndexerStatistics::default(),
            start_time: Instant::now(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Projection store, for queries
    pub fn store(&self) -> &ProjectionStore<B> {
        self.projector.store()
    }

    /// Counters since start
    pub fn statistics(&self) -> &IndexerStatistics {
        &self.stats
    }

    /// Seconds since the indexer was created
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Last applied block, as persisted
    pub fn cursor(&self) -> Result<Option<u64>> {
        self.store().cursor()
    }

    /// Apply one block.
    ///
    /// Fails only when the block precedes the cursor or storage fails.
    pub fn handle_block(&mut self, block: &Block) -> Result<BlockSummary> {
        if block.number < self.config.starting_block {
            debug!(block = block.number, "before starting block, skipped");
            self.stats.blocks_skipped += 1;
            return Ok(BlockSummary {
                skipped: true,
                ..Default::default()
            });
        }

        if let Some(cursor) = self.cursor()? {
            if block.number < cursor {
                return Err(Error::OutOfOrder {
                    cursor,
                    got: block.number,
                });
            }
        }

        let mut summary = BlockSummary::default();
        for (index, raw) in block.events.iter().enumerate() {
            let event_index = u32::try_from(index)
                .map_err(|_| Error::Internal(format!("block {} has too many events", block.number)))?;
            let ctx = EventContext {
                block_number: block.number,
                block_timestamp: block.timestamp,
                tx_hash: raw.tx_hash,
                event_index,
            };

            if self.handle_event(&ctx, raw)? {
                summary.applied += 1;
            } else {
                summary.rejected += 1;
            }
        }

        self.store().set_cursor(block.number)?;
        self.stats.blocks_applied += 1;
        self.stats.latest_block = Some(block.number);

        info!(
            block = block.number,
            applied = summary.applied,
            rejected = summary.rejected,
            "block applied"
        );

        Ok(summary)
    }

    /// Returns whether the event reached the projection
    fn handle_event(&mut self, ctx: &EventContext, raw: &RawEvent) -> Result<bool> {
        let Some(kind) = EventKind::from_selector(&raw.selector) else {
            debug!(selector = %raw.selector, "unknown selector, skipped");
            self.stats.unknown_selectors += 1;
            return Ok(false);
        };

        let expected = kind.role().address(&self.config.contracts);
        if raw.from_address != expected {
            debug!(kind = %kind, from = %raw.from_address, "event from unexpected contract, skipped");
            self.stats.foreign_events += 1;
            return Ok(false);
        }

        let event = match decode(kind, &raw.data) {
            Ok(event) => event,
            Err(e) => {
                warn!(kind = %kind, block = ctx.block_number, error = %e, "decode failed");
                self.stats.decode_errors += 1;
                return Ok(false);
            }
        };

        match self.projector.apply(ctx, &event) {
            Ok(_) => {
                self.stats.events_applied += 1;
                *self
                    .stats
                    .events_by_kind
                    .entry(kind.name().to_string())
                    .or_insert(0) += 1;
                Ok(true)
            }
            Err(e) if e.is_integrity_violation() => {
                warn!(kind = %kind, block = ctx.block_number, error = %e, "integrity violation");
                self.stats.integrity_violations += 1;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Roll the projection back to the state right after `cursor`
    pub fn invalidate(&mut self, cursor: u64) -> Result<RollbackSummary> {
        let summary = self.store().rollback_to(cursor)?;
        self.stats.rollbacks += 1;
        self.stats.latest_block = Some(cursor);
        warn!(
            cursor,
            removed = summary.versions_removed,
            reopened = summary.versions_reopened,
            deleted = summary.rows_deleted,
            "projection invalidated"
        );
        Ok(summary)
    }

    /// Flush the backend
    pub fn flush(&self) -> Result<()> {
        self.store().flush()
    }

    /// Release the projection store
    pub fn into_store(self) -> ProjectionStore<B> {
        self.projector.into_store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ContractAddresses;
    use crate::projection::entities::Adventurer;
    use crate::storage::backend::MemoryBackend;

    fn config() -> IndexerConfig {
        IndexerConfig {
            starting_block: 10,
            ..Default::default()
        }
    }

    fn event(contracts: &ContractAddresses, kind: EventKind, data: &[u64]) -> RawEvent {
        RawEvent {
            from_address: kind.role().address(contracts),
            selector: kind.selector(),
            data: data.iter().map(|v| Felt::from_u64(*v)).collect(),
            tx_hash: Felt::from_u64(0xbeef),
        }
    }

    #[test]
    fn test_block_counts_bad_events() {
        let config = config();
        let c = config.contracts;
        let mut indexer = Indexer::new(config, MemoryBackend::new());

        let mut foreign = event(&c, EventKind::UpdateGold, &[7, 1]);
        foreign.from_address = Felt::from_u64(0x1234);
        let mut unknown = event(&c, EventKind::UpdateGold, &[7, 1]);
        unknown.selector = Felt::from_u64(42);

        let block = Block {
            number: 12,
            timestamp: 1_000,
            events: vec![
                event(&c, EventKind::MintAdventurer, &[7, 0xabc]),
                event(&c, EventKind::UpdateGold, &[7]),
                foreign,
                unknown,
                event(&c, EventKind::MintAdventurer, &[7, 0xabc]),
                event(&c, EventKind::UpdateGold, &[7, 45]),
            ],
        };

        let summary = indexer.handle_block(&block).unwrap();
        assert_eq!(summary.applied, 2);
        assert_eq!(summary.rejected, 4);

        let stats = indexer.statistics();
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.foreign_events, 1);
        assert_eq!(stats.unknown_selectors, 1);
        assert_eq!(stats.integrity_violations, 1);
        assert_eq!(stats.events_by_kind.get("UpdateGold"), Some(&1));
        assert_eq!(indexer.cursor().unwrap(), Some(12));

        let row = indexer
            .store()
            .get_current::<Adventurer>(Felt::from_u64(7).as_bytes())
            .unwrap()
            .unwrap();
        assert_eq!(row.gold, Some(Felt::from_u64(45)));
    }

    #[test]
    fn test_starting_block_and_order() {
        let config = config();
        let c = config.contracts;
        let mut indexer = Indexer::new(config, MemoryBackend::new());

        let early = Block {
            number: 5,
            timestamp: 1,
            events: vec![event(&c, EventKind::MintAdventurer, &[1, 2])],
        };
        assert!(indexer.handle_block(&early).unwrap().skipped);
        assert_eq!(indexer.cursor().unwrap(), None);

        indexer
            .handle_block(&Block { number: 20, timestamp: 2, events: vec![] })
            .unwrap();
        let err = indexer
            .handle_block(&Block { number: 15, timestamp: 3, events: vec![] })
            .unwrap_err();
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn test_invalidate_restores_previous_state() {
        let config = config();
        let c = config.contracts;
        let mut indexer = Indexer::new(config, MemoryBackend::new());

        for (number, gold) in [(11u64, 5u64), (12, 9), (13, 30)] {
            let mut events = vec![event(&c, EventKind::UpdateGold, &[7, gold])];
            if number == 11 {
                events.insert(0, event(&c, EventKind::MintAdventurer, &[7, 0xabc]));
            }
            indexer
                .handle_block(&Block { number, timestamp: number * 10, events })
                .unwrap();
        }

        let summary = indexer.invalidate(11).unwrap();
        assert_eq!(summary.versions_removed, 2);
        assert_eq!(indexer.cursor().unwrap(), Some(11));

        let row = indexer
            .store()
            .get_current::<Adventurer>(Felt::from_u64(7).as_bytes())
            .unwrap()
            .unwrap();
        assert_eq!(row.gold, Some(Felt::from_u64(5)));
        assert_eq!(row.last_updated, 110);

        indexer.invalidate(10).unwrap();
        assert!(indexer
            .store()
            .get_current::<Adventurer>(Felt::from_u64(7).as_bytes())
            .unwrap()
            .is_none());
    }
}
