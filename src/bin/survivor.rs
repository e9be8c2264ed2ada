//! Survivor indexer CLI
//!
//! Local bootstrap for the indexer: replays recorded blocks into a
//! projection, queries it, rolls it back and reports on it.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};

use survivor_indexer::core::config::{IndexerConfig, StorageKind};
use survivor_indexer::indexer::{Block, Indexer};
use survivor_indexer::projection::entities::{
    Adventurer, Battle, Beast, Collection, Discovery, Heist, Item, Listing,
};
use survivor_indexer::query::QueryExecutor;
use survivor_indexer::storage::{open_backend, StorageBackend};

/// Survivor indexer - projects game events into queryable collections
#[derive(Parser)]
#[command(name = "survivor")]
#[command(version = survivor_indexer::VERSION)]
#[command(about = "Replay, query and roll back a game event projection", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "SURVIVOR_CONFIG")]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Override the storage backend (memory, snapshot, rocks)
    #[arg(short, long)]
    storage: Option<StorageKind>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Feed a JSON-lines file of blocks through the pipeline
    Replay {
        /// One block per line
        file: PathBuf,
    },

    /// Query a collection
    Query {
        /// adventurers, beasts, items, tokens, discoveries, battles or heists
        collection: Collection,

        /// Filter tree as JSON
        #[arg(short, long = "where")]
        filter: Option<String>,

        /// Sort specification as JSON
        #[arg(short, long)]
        order_by: Option<String>,

        /// Rows to skip
        #[arg(long)]
        skip: Option<usize>,

        /// Maximum rows to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Read the state as of a past block
        #[arg(long)]
        as_of: Option<u64>,
    },

    /// Undo everything written after a block
    Rollback {
        /// Last block to keep
        block: u64,
    },

    /// Show the cursor and collection sizes
    Stats,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let term = Term::stdout();

    if let Err(e) = run_command(&cli, &term) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init { force } => cmd_init(cli, *force, term),
        Commands::Replay { file } => cmd_replay(cli, file, term),
        Commands::Query {
            collection,
            filter,
            order_by,
            skip,
            limit,
            as_of,
        } => {
            let mut input = serde_json::Map::new();
            if let Some(filter) = filter {
                input.insert("where".into(), parse_json("--where", filter)?);
            }
            if let Some(order_by) = order_by {
                input.insert("orderBy".into(), parse_json("--order-by", order_by)?);
            }
            if let Some(skip) = skip {
                input.insert("skip".into(), (*skip).into());
            }
            if let Some(limit) = limit {
                input.insert("limit".into(), (*limit).into());
            }
            if let Some(block) = as_of {
                input.insert("asOf".into(), (*block).into());
            }
            cmd_query(cli, *collection, &serde_json::Value::Object(input).to_string(), term)
        }
        Commands::Rollback { block } => cmd_rollback(cli, *block, term),
        Commands::Stats => cmd_stats(cli, term),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETUP
// ═══════════════════════════════════════════════════════════════════════════════

fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(IndexerConfig::default_path)
}

fn load_config(cli: &Cli) -> anyhow::Result<IndexerConfig> {
    let path = config_path(cli);
    let mut config = if path.exists() {
        IndexerConfig::load(&path).with_context(|| format!("loading {}", path.display()))?
    } else {
        IndexerConfig::default()
    };

    config.apply_overrides(|name| std::env::var(name).ok())?;

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(storage) = cli.storage {
        config.storage = storage;
    }

    config.validate()?;
    Ok(config)
}

fn open_indexer(cli: &Cli) -> anyhow::Result<Indexer<Box<dyn StorageBackend>>> {
    let config = load_config(cli)?;
    if !config.storage.is_persistent() {
        tracing::warn!("memory storage selected; nothing will outlive this command");
    }
    let backend = open_backend(&config)
        .with_context(|| format!("opening {} storage", config.storage))?;
    Ok(Indexer::new(config, backend))
}

fn parse_json(flag: &str, text: &str) -> anyhow::Result<serde_json::Value> {
    serde_json::from_str(text).with_context(|| format!("{} is not valid JSON", flag))
}

fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} blocks {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_init(cli: &Cli, force: bool, term: &Term) -> anyhow::Result<()> {
    let path = config_path(cli);
    if path.exists() && !force {
        anyhow::bail!(
            "Configuration already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    let config = IndexerConfig {
        storage: StorageKind::Snapshot,
        ..Default::default()
    };
    config.save(&path)?;

    term.write_line(&format!(
        "{} Configuration written to {}",
        style("✓").green(),
        style(path.display()).yellow()
    ))?;
    Ok(())
}

fn cmd_replay(cli: &Cli, file: &PathBuf, term: &Term) -> anyhow::Result<()> {
    let mut indexer = open_indexer(cli)?;

    let lines: Vec<String> = BufReader::new(
        File::open(file).with_context(|| format!("opening {}", file.display()))?,
    )
    .lines()
    .collect::<Result<_, _>>()?;

    let bar = progress_bar(lines.len() as u64);
    for (number, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            bar.inc(1);
            continue;
        }

        let block: Block = serde_json::from_str(line)
            .with_context(|| format!("{}:{} is not a block", file.display(), number + 1))?;
        indexer.handle_block(&block)?;

        bar.set_message(format!("#{}", block.number));
        bar.inc(1);
    }
    bar.finish_and_clear();
    indexer.flush()?;

    let stats = indexer.statistics();
    term.write_line(&format!(
        "{} Replayed {} blocks ({} skipped), {} events applied",
        style("✓").green(),
        style(stats.blocks_applied).cyan(),
        stats.blocks_skipped,
        style(stats.events_applied).cyan()
    ))?;

    let rejected = stats.unknown_selectors
        + stats.foreign_events
        + stats.decode_errors
        + stats.integrity_violations;
    if rejected > 0 {
        term.write_line(&format!(
            "{} {} events rejected: {} unknown, {} foreign, {} undecodable, {} integrity",
            style("⚠").yellow(),
            rejected,
            stats.unknown_selectors,
            stats.foreign_events,
            stats.decode_errors,
            stats.integrity_violations
        ))?;
    }

    for (kind, count) in &stats.events_by_kind {
        term.write_line(&format!("  {:<24} {}", kind, count))?;
    }
    Ok(())
}

fn cmd_query(cli: &Cli, collection: Collection, input: &str, term: &Term) -> anyhow::Result<()> {
    let indexer = open_indexer(cli)?;
    let config = indexer.config();
    let executor = QueryExecutor::new(indexer.store(), &config.tables)
        .with_default_limit(config.default_limit);

    let rows = executor.run_json(collection, input)?;
    term.write_line(&serde_json::to_string_pretty(&rows)?)?;
    Ok(())
}

fn cmd_rollback(cli: &Cli, block: u64, term: &Term) -> anyhow::Result<()> {
    let mut indexer = open_indexer(cli)?;
    let summary = indexer.invalidate(block)?;
    indexer.flush()?;

    term.write_line(&format!(
        "{} Rolled back to block {}: {} versions removed, {} reopened, {} rows deleted",
        style("✓").green(),
        style(block).cyan(),
        summary.versions_removed,
        summary.versions_reopened,
        summary.rows_deleted
    ))?;
    Ok(())
}

fn cmd_stats(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    let indexer = open_indexer(cli)?;
    let store = indexer.store();

    let cursor = store
        .cursor()?
        .map_or_else(|| "none".to_string(), |c| c.to_string());
    term.write_line(&format!(
        "{} Network {}, cursor {}",
        style("→").cyan(),
        style(indexer.config().network).yellow(),
        style(cursor).cyan()
    ))?;

    for collection in Collection::ALL {
        let count = match collection {
            Collection::Adventurers => store.count_current::<Adventurer>()?,
            Collection::Beasts => store.count_current::<Beast>()?,
            Collection::Items => store.count_current::<Item>()?,
            Collection::Tokens => store.count_current::<Listing>()?,
            Collection::Discoveries => store.count_current::<Discovery>()?,
            Collection::Battles => store.count_current::<Battle>()?,
            Collection::Heists => store.count_current::<Heist>()?,
        };
        term.write_line(&format!("  {:<12} {}", collection.name(), count))?;
    }
    Ok(())
}
