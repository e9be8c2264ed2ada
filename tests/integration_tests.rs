//! Integration tests for the survivor indexer.
//!
//! These tests drive raw blocks through the full pipeline and read the
//! projection back through the query executor.

use survivor_indexer::core::config::IndexerConfig;
use survivor_indexer::core::felt::{encode_ascii, Felt};
use survivor_indexer::events::EventKind;
use survivor_indexer::indexer::{Block, Indexer, RawEvent};
use survivor_indexer::projection::entities::{Adventurer, Collection};
use survivor_indexer::query::filter::AdventurersFilter;
use survivor_indexer::query::{QueryExecutor, QueryInput, SortSpec};
use survivor_indexer::storage::{MemoryBackend, SnapshotBackend, StorageBackend};

// ═══════════════════════════════════════════════════════════════════════════════
// TEST HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn config() -> IndexerConfig {
    IndexerConfig {
        starting_block: 0,
        ..Default::default()
    }
}

fn raw(config: &IndexerConfig, kind: EventKind, data: Vec<Felt>) -> RawEvent {
    RawEvent {
        from_address: kind.role().address(&config.contracts),
        selector: kind.selector(),
        data,
        tx_hash: Felt::from_u64(0x7a),
    }
}

fn felts(values: &[u64]) -> Vec<Felt> {
    values.iter().map(|v| Felt::from_u64(*v)).collect()
}

fn adventurer_state(id: u64, name: &str, race: u64, level: u64, xp: u64) -> Vec<Felt> {
    let mut data = felts(&[id, race, 12, 1_690_000_000]);
    data.push(encode_ascii(name).unwrap());
    data.push(Felt::from_u64(3));
    data.push(encode_ascii("img-a").unwrap());
    data.push(encode_ascii("img-b").unwrap());
    // health, level, six stats, luck, xp
    data.extend(felts(&[100, level, 1, 2, 3, 4, 5, 6, 7, xp]));
    // equipment slots, status, beast, upgrading
    data.extend(felts(&[11, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1]));
    data
}

fn block(number: u64, events: Vec<RawEvent>) -> Block {
    Block {
        number,
        timestamp: 1_690_000_000 + number,
        events,
    }
}

fn ids(rows: &[serde_json::Value]) -> Vec<&str> {
    rows.iter().filter_map(|r| r["id"].as_str()).collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// END TO END
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_mint_then_gold_is_queryable() {
    let config = config();
    let events = vec![
        raw(&config, EventKind::MintAdventurer, felts(&[7, 0xABC])),
        raw(&config, EventKind::UpdateGold, felts(&[7, 45])),
    ];
    let mut indexer = Indexer::new(config, MemoryBackend::new());
    indexer.handle_block(&block(100, events)).unwrap();

    let executor = QueryExecutor::new(indexer.store(), &indexer.config().tables);
    let rows = executor
        .run_json(Collection::Adventurers, r#"{"where": {"id": {"eq": 7}}}"#)
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["owner"], "0xabc");
    assert_eq!(rows[0]["gold"], "0x2d");

    let typed = executor
        .query::<Adventurer>(&QueryInput {
            filter: serde_json::from_str(r#"{"owner": {"eq": "0xabc"}}"#).unwrap(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(typed.len(), 1);
    assert_eq!(typed[0].gold, Some(Felt::from_u64(45)));
    assert_eq!(typed[0].owner, Some(Felt::from_u64(0xABC)));
}

#[test]
fn test_state_updates_and_label_filters() {
    let config = config();
    let events = vec![
        raw(&config, EventKind::MintAdventurer, felts(&[1, 0xA1])),
        raw(&config, EventKind::MintAdventurer, felts(&[2, 0xA2])),
        raw(&config, EventKind::MintAdventurer, felts(&[3, 0xA3])),
        raw(&config, EventKind::UpdateAdventurerState, adventurer_state(1, "loaf", 1, 6, 30)),
        raw(&config, EventKind::UpdateAdventurerState, adventurer_state(2, "toast", 4, 9, 10)),
        raw(&config, EventKind::UpdateAdventurerState, adventurer_state(3, "crumb", 1, 2, 20)),
    ];
    let mut indexer = Indexer::new(config, MemoryBackend::new());
    indexer.handle_block(&block(200, events)).unwrap();

    let executor = QueryExecutor::new(indexer.store(), &indexer.config().tables);

    let rows = executor
        .run_json(
            Collection::Adventurers,
            r#"{"where": {"level": {"gte": 5}, "race": {"eq": "Elf"}}}"#,
        )
        .unwrap();
    assert_eq!(ids(&rows), vec!["0x1"]);
    assert_eq!(rows[0]["race"], "Elf");
    assert_eq!(rows[0]["name"], "loaf");
    assert_eq!(rows[0]["upgrading"], true);
    assert!(rows[0]["chestId"].is_null());

    let rows = executor
        .run_json(
            Collection::Adventurers,
            r#"{"orderBy": {"xp": {"asc": true}, "level": {"desc": true}}}"#,
        )
        .unwrap();
    assert_eq!(ids(&rows), vec!["0x2", "0x3", "0x1"]);

    let rows = executor
        .run_json(
            Collection::Adventurers,
            r#"{"where": {"name": {"endsWith": "st"}}, "orderBy": {"xp": {}}}"#,
        )
        .unwrap();
    assert_eq!(ids(&rows), vec!["0x2"]);
}

#[test]
fn test_reorg_rolls_back_and_replays() {
    let config = config();
    let mut indexer = Indexer::new(config.clone(), MemoryBackend::new());

    indexer
        .handle_block(&block(
            10,
            vec![
                raw(&config, EventKind::MintAdventurer, felts(&[7, 0xABC])),
                raw(&config, EventKind::UpdateGold, felts(&[7, 5])),
            ],
        ))
        .unwrap();
    indexer
        .handle_block(&block(
            11,
            vec![
                raw(&config, EventKind::UpdateGold, felts(&[7, 50])),
                raw(&config, EventKind::BeastAttacked, felts(&[3, 7, 12])),
            ],
        ))
        .unwrap();

    let summary = indexer.invalidate(10).unwrap();
    assert_eq!(summary.versions_removed, 2);
    assert_eq!(summary.rows_deleted, 1);

    let executor = QueryExecutor::new(indexer.store(), &indexer.config().tables);
    let rows = executor.run_json(Collection::Adventurers, "").unwrap();
    assert_eq!(rows[0]["gold"], "0x5");
    assert!(executor.run_json(Collection::Battles, "").unwrap().is_empty());

    // The canonical block 11 is applied on top of the restored state.
    indexer
        .handle_block(&block(11, vec![raw(&config, EventKind::UpdateGold, felts(&[7, 8]))]))
        .unwrap();
    let executor = QueryExecutor::new(indexer.store(), &indexer.config().tables);
    let rows = executor.run_json(Collection::Adventurers, "").unwrap();
    assert_eq!(rows[0]["gold"], "0x8");

    let past = executor
        .run_json(Collection::Adventurers, r#"{"asOf": 10}"#)
        .unwrap();
    assert_eq!(past[0]["gold"], "0x5");
}

#[test]
fn test_sort_spec_builder_matches_json() {
    let config = config();
    let events = (1..=4)
        .map(|id| raw(&config, EventKind::UpdateGold, felts(&[id, 100 - id])))
        .collect();
    let mut indexer = Indexer::new(config, MemoryBackend::new());
    indexer.handle_block(&block(1, events)).unwrap();

    let executor = QueryExecutor::new(indexer.store(), &indexer.config().tables);
    let input = QueryInput::<AdventurersFilter> {
        order_by: SortSpec::new().asc("gold"),
        skip: Some(1),
        limit: Some(2),
        ..Default::default()
    };
    let rows = executor.query::<Adventurer>(&input).unwrap();
    let got: Vec<_> = rows.iter().map(|r| r.id).collect();
    assert_eq!(got, vec![Felt::from_u64(3), Felt::from_u64(2)]);
}

#[test]
fn test_snapshot_survives_reopen() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = config();

    {
        let backend = SnapshotBackend::open(temp_dir.path()).unwrap();
        let mut indexer = Indexer::new(config.clone(), backend);
        indexer
            .handle_block(&block(
                5,
                vec![raw(&config, EventKind::MintAdventurer, felts(&[9, 0xF00]))],
            ))
            .unwrap();
        indexer.flush().unwrap();
    }

    let backend = SnapshotBackend::open(temp_dir.path()).unwrap();
    assert!(backend.exists(b"meta:cursor").unwrap());

    let indexer = Indexer::new(config, backend);
    assert_eq!(indexer.cursor().unwrap(), Some(5));

    let executor = QueryExecutor::new(indexer.store(), &indexer.config().tables);
    let rows = executor.run_json(Collection::Adventurers, "").unwrap();
    assert_eq!(rows[0]["owner"], "0xf00");
}

#[test]
fn test_gold_every_block_keeps_history_bounded() {
    let config = IndexerConfig {
        finality_depth: Some(16),
        ..config()
    };
    let mut indexer = Indexer::new(config.clone(), MemoryBackend::new());

    for number in 1..=2_000u64 {
        indexer
            .handle_block(&block(
                number,
                vec![raw(&config, EventKind::UpdateGold, felts(&[7, number]))],
            ))
            .unwrap();
    }

    let history = indexer
        .store()
        .history::<Adventurer>(Felt::from_u64(7).as_bytes())
        .unwrap();
    assert_eq!(history.len(), 17);
    assert_eq!(history.last().map(|v| v.valid_from), Some(2_000));

    let err = indexer.invalidate(1_000).unwrap_err();
    assert_eq!(err.code(), 3003);

    indexer.invalidate(1_990).unwrap();
    let executor = QueryExecutor::new(indexer.store(), &indexer.config().tables);
    let rows = executor.run_json(Collection::Adventurers, "").unwrap();
    assert_eq!(rows[0]["gold"], format!("0x{:x}", 1_990));
}
