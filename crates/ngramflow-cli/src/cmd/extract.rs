//! Extract subcommand - pipelined query mode
//!
//! One query per stdin line, one response line per query on stdout, in
//! the same order. There are no correlation ids; correctness rests on
//! FIFO preservation on both sides of the backend.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{Result, bail};
use clap::Args;

use ngramflow_core::indexer::{IndexerProcess, OutputMode};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Index location passed to the backend
    #[arg(short, long)]
    pub index: PathBuf,
}

pub fn run(args: ExtractArgs, config: &Config) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut backend = IndexerProcess::spawn(
        &config.backend.query_command(&args.index),
        OutputMode::Forward(tx),
    )?;

    // Responses arrive while queries are still being written
    let printer = thread::spawn(move || {
        let mut out = std::io::stdout().lock();
        for line in rx {
            if writeln!(out, "{line}").is_err() {
                break;
            }
        }
    });

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        backend.write_line(line.trim())?;
    }

    // EOF on stdin: tell the backend to flush and exit, then let the
    // printer drain the remaining responses
    let status = backend.shutdown(config.pipeline.shutdown_grace())?;
    printer.join().expect("printer thread panicked");

    if !status.success() {
        bail!("backend exited with status {}", status.code().unwrap_or(-1));
    }
    Ok(())
}
