//! ngramflow - stream compressed corpus shards into a line-oriented
//! indexing backend
//!
//! The `index` subcommand runs the resumable ingestion pipeline; `list`
//! generates the Google Books shard list; `extract` and `time` drive the
//! backend's pipelined query mode.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "ngramflow")]
#[command(about = "Stream compressed corpus shards into an indexing backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (default: ./ngramflow.toml or ~/.config/ngramflow/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ingestion pipeline over a work-item list
    Index(cmd::index::IndexArgs),
    /// Generate the Google Books shard list for an n-gram order
    List(cmd::list::ListArgs),
    /// Stream queries from stdin through the backend, responses to stdout
    Extract(cmd::extract::ExtractArgs),
    /// Measure backend query latency over a sampled word list
    Time(cmd::time::TimeArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(ngramflow_core::ProgressContext::new());

    // Route logs through indicatif in TTY mode so retry and progress
    // messages interleave above the status line instead of through it
    let multi = if progress.is_tty() {
        Some(progress.multi())
    } else {
        None
    };
    ngramflow_core::init_logging(cli.quiet, cli.debug, multi);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Index(args) => cmd::index::run(args, &config, &progress),
        Command::List(args) => cmd::list::run(args, &config),
        Command::Extract(args) => cmd::extract::run(args, &config),
        Command::Time(args) => cmd::time::run(args, &config),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec!["Backend program", &config.backend.program]);
            table.add_row(vec!["Backend args", &config.backend.args.join(" ")]);
            table.add_row(vec!["Ingest class", &config.backend.ingest_class]);
            table.add_row(vec!["Query class", &config.backend.query_class]);
            table.add_row(vec!["Timing class", &config.backend.timing_class]);
            table.add_row(vec![
                "Ledger",
                &config.pipeline.ledger.display().to_string(),
            ]);
            table.add_row(vec![
                "Queue depth",
                &config.pipeline.queue_depth.to_string(),
            ]);
            table.add_row(vec![
                "Retry delay",
                &format!("{}s", config.pipeline.retry_delay_secs),
            ]);
            table.add_row(vec![
                "Shutdown grace",
                &format!("{}s", config.pipeline.shutdown_grace_secs),
            ]);
            table.add_row(vec!["Books base URL", &config.books.base_url]);
            table.add_row(vec!["Books corpus", &config.books.corpus]);
            table.add_row(vec!["Books version", &config.books.version]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
