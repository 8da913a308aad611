//! Index a feed log into sqlite.
//!
//! By default this reads `log.jsonl` and rebuilds `db.sqlite` from scratch.
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::*;

use feedidx_datastore::{OpenMode, SqliteStore};
use feedidx_ingest::{parse_count, IngestConfig, Ingestor, DEFAULT_COMMIT_EVERY, DEFAULT_LIMIT};

#[derive(Debug, Parser)]
#[command(name = "feedidx", version, about = "Index a feed log into a sqlite database")]
struct Args {
    /// Newline-delimited JSON log to read.
    #[arg(long, env = "FEEDIDX_LOG", default_value = "log.jsonl")]
    log: PathBuf,

    /// Database to write.
    #[arg(long, env = "FEEDIDX_DB", default_value = "db.sqlite", conflicts_with = "in_memory")]
    db: PathBuf,

    /// Stop after indexing this many messages.
    #[arg(long, env = "FEEDIDX_LIMIT", default_value_t = DEFAULT_LIMIT, value_parser = parse_count)]
    limit: u64,

    /// Commit a transaction every this many messages.
    #[arg(long, env = "FEEDIDX_COMMIT_EVERY", default_value_t = DEFAULT_COMMIT_EVERY, value_parser = parse_count)]
    commit_every: u64,

    /// Keep an existing database instead of reindexing from scratch.
    #[arg(long)]
    append: bool,

    /// Index into a throwaway in-memory database.
    #[arg(long)]
    in_memory: bool,
}

fn main() -> Result<()> {
    feedidx_logging::log_to_stderr();
    let args = Args::parse();

    let config = IngestConfig::new(args.limit, args.commit_every)?;

    let input = std::fs::File::open(&args.log)
        .with_context(|| format!("Could not open log {}", args.log.display()))?;

    let store = if args.in_memory {
        SqliteStore::open_in_memory()?
    } else {
        let mode = if args.append {
            OpenMode::Append
        } else {
            OpenMode::Reindex
        };
        SqliteStore::open(&args.db, mode)
            .with_context(|| format!("Could not open database {}", args.db.display()))?
    };

    let report = Ingestor::new(store, config)
        .run(BufReader::new(input))
        .with_context(|| format!("Indexing {} failed", args.log.display()))?;

    for line in report.summary_lines() {
        info!("{}", line);
    }

    Ok(())
}
