//! Time subcommand - measure backend query latency
//!
//! Warms the backend with a sampled batch, lets its output settle, then
//! times a larger sampled batch end to end (including input close and
//! output drain) and reports the mean seconds per query.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Args;
use rand::seq::SliceRandom;

use ngramflow_core::indexer::{IndexerProcess, OutputMode};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct TimeArgs {
    /// Index location passed to the backend
    #[arg(short, long)]
    pub index: PathBuf,

    /// Word list to sample queries from
    #[arg(short, long, default_value = "/usr/share/dict/words")]
    pub words: PathBuf,

    /// Warm-up queries before timing starts
    #[arg(long, default_value_t = 100)]
    pub warmup: usize,

    /// Timed queries
    #[arg(long, default_value_t = 1000)]
    pub queries: usize,

    /// Seconds to let the warm-up output catch up
    #[arg(long, default_value_t = 5)]
    pub settle: u64,
}

pub fn run(args: TimeArgs, config: &Config) -> Result<()> {
    let text = std::fs::read_to_string(&args.words)
        .with_context(|| format!("failed to read word list {}", args.words.display()))?;
    let words: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        bail!("word list {} is empty", args.words.display());
    }

    let mut rng = rand::thread_rng();
    let warmup: Vec<&str> = words
        .choose_multiple(&mut rng, args.warmup)
        .copied()
        .collect();
    let timed: Vec<&str> = words
        .choose_multiple(&mut rng, args.queries)
        .copied()
        .collect();

    let mut backend = IndexerProcess::spawn(
        &config.backend.timing_command(&args.index),
        OutputMode::Discard,
    )?;

    log::info!("warming up with {} queries", warmup.len());
    for word in &warmup {
        backend.write_line(word)?;
    }

    // Let the output catch up before the clock starts
    std::thread::sleep(Duration::from_secs(args.settle));

    log::info!("timing {} queries", timed.len());
    let start = Instant::now();
    for word in &timed {
        backend.write_line(word)?;
    }
    let status = backend.shutdown(config.pipeline.shutdown_grace())?;
    let elapsed = start.elapsed();

    if !status.success() {
        bail!("backend exited with status {}", status.code().unwrap_or(-1));
    }

    println!(
        "Result: {} s",
        elapsed.as_secs_f64() / timed.len().max(1) as f64
    );
    Ok(())
}
