//! Index subcommand - run the ingestion pipeline

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use ngramflow_core::ProgressContext;
use ngramflow_ingest::{run_pipeline, worklist};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Index location passed to the backend
    #[arg(short, long)]
    pub index: PathBuf,

    /// Work-item list file, one locator per line (default: stdin)
    #[arg(short, long)]
    pub list: Option<PathBuf>,

    /// Completion ledger path
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Relay queue capacity
    #[arg(long)]
    pub queue_depth: Option<usize>,

    /// Seconds to wait between retrieval retries
    #[arg(long)]
    pub retry_delay: Option<u64>,
}

pub fn run(args: IndexArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let locators = match &args.list {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open work list {}", path.display()))?;
            worklist::load(BufReader::new(file))?
        }
        None => worklist::load(std::io::stdin().lock())?,
    };

    let mut pipeline = config.pipeline.pipeline_config();
    if let Some(ledger) = args.ledger {
        pipeline.ledger_path = ledger;
    }
    if let Some(depth) = args.queue_depth {
        pipeline.queue_depth = depth;
    }
    if let Some(secs) = args.retry_delay {
        pipeline.retry.delay = Duration::from_secs(secs);
    }

    // Reading the list from stdin leaves no stream for the `q` command
    if args.list.is_none() {
        pipeline.interactive = false;
    }

    let backend = config.backend.ingest_command(&args.index);
    run_pipeline(locators, &backend, &pipeline, progress)?;
    Ok(())
}
