//! Pipeline orchestration: threads, telemetry loop, control, shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;

use ngramflow_core::indexer::{BackendCommand, IndexerProcess, OutputMode};
use ngramflow_core::relay::RelayQueue;
use ngramflow_core::telemetry::status_line;
use ngramflow_core::{CancelToken, Document, Ledger, PipelineError, ProgressContext, Telemetry};

use crate::config::PipelineConfig;
use crate::feeder::{FeederStats, run_feeder};
use crate::fetcher::run_fetcher;
use crate::worklist::mark_done;

/// Telemetry render interval
const TICK: Duration = Duration::from_millis(100);

/// Run the full ingestion pipeline over the given locator list.
///
/// Blocks until the list is exhausted, the operator quits, or a fatal
/// error stops the run. The final "Exited" / "Index should not be
/// corrupted" lines are printed on every path; fatal errors are
/// distinguishable by the messages interleaved above them.
pub fn run_pipeline(
    locators: Vec<String>,
    backend: &BackendCommand,
    config: &PipelineConfig,
    progress: &ProgressContext,
) -> anyhow::Result<IndexSummary> {
    let start = Instant::now();

    let ledger = Ledger::load(&config.ledger_path).with_context(|| {
        format!("failed to load ledger {}", config.ledger_path.display())
    })?;
    let items = mark_done(locators, &ledger);
    let total_items = items.len();
    let pending = items.iter().filter(|i| !i.done).count();
    log::info!(
        "{} work items, {} already complete, {} to go",
        items.len(),
        items.len() - pending,
        pending
    );

    if pending == 0 {
        log::info!("Nothing to do");
        let summary = IndexSummary {
            total_items,
            skipped: total_items,
            elapsed: start.elapsed(),
            ..IndexSummary::default()
        };
        return Ok(conclude(summary, progress));
    }

    let cancel = CancelToken::new();
    if config.interactive {
        for sig in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            if let Err(e) = signal_hook::flag::register(sig, cancel.flag()) {
                log::warn!("failed to register signal handler: {e}");
            }
        }
    }

    let indexer = IndexerProcess::spawn(backend, OutputMode::Discard)
        .with_context(|| format!("failed to launch backend: {backend}"))?;

    let telemetry = Arc::new(Telemetry::new());
    let queue: Arc<RelayQueue<Document>> = Arc::new(RelayQueue::with_capacity(config.queue_depth));
    let finished = Arc::new(AtomicBool::new(false));

    // Telemetry renderer: one combined line, overwritten in place
    let renderer = {
        let telemetry = telemetry.clone();
        let finished = finished.clone();
        let pb = progress.status_line();
        thread::spawn(move || {
            let mut prev = telemetry.snapshot();
            let mut last = Instant::now();
            while !finished.load(Ordering::Relaxed) {
                thread::sleep(TICK);
                let cur = telemetry.snapshot();
                let now = Instant::now();
                pb.set_message(status_line(&prev, &cur, now - last));
                prev = cur;
                last = now;
            }
            pb.finish_and_clear();
        })
    };

    // Control surface: single-character commands on stdin. Detached on
    // purpose — it blocks in read until the next line and nothing ever
    // interrupts that; the process exits with it still parked.
    if config.interactive {
        let cancel = cancel.clone();
        let queue = queue.clone();
        let finished = finished.clone();
        thread::spawn(move || {
            let mut line = String::new();
            loop {
                line.clear();
                match std::io::stdin().read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                if finished.load(Ordering::Relaxed) {
                    break;
                }
                if line.trim() == "q" {
                    log::info!("Quitting...");
                    cancel.cancel();
                    queue.cancel();
                    break;
                }
            }
        });
    }

    let fetcher = {
        let queue = queue.clone();
        let telemetry = telemetry.clone();
        let cancel = cancel.clone();
        let policy = config.retry;
        thread::spawn(move || run_fetcher(&items, &queue, &telemetry, &policy, &cancel))
    };

    let feeder = {
        let queue = queue.clone();
        let telemetry = telemetry.clone();
        let cancel = cancel.clone();
        let mut indexer = indexer;
        let mut ledger = ledger;
        thread::spawn(move || {
            let result = run_feeder(&queue, &mut indexer, &mut ledger, &telemetry, &cancel);
            (indexer, result)
        })
    };

    let fetch_stats = fetcher.join().expect("fetcher thread panicked");
    let (indexer, feed_result) = feeder.join().expect("feeder thread panicked");

    finished.store(true, Ordering::Relaxed);
    renderer.join().expect("renderer thread panicked");

    // Backend shutdown: close input, bounded wait, join drain
    let mut fatal: Option<anyhow::Error> = None;
    let feed_stats = match feed_result {
        Ok(stats) => stats,
        Err(e) => {
            fatal = Some(e.into());
            FeederStats::default()
        }
    };
    match indexer.shutdown(config.shutdown_grace) {
        Ok(status) if status.success() => {}
        Ok(status) => {
            let e = PipelineError::BackendExit(status.code().unwrap_or(-1));
            log::error!("{e}");
            fatal.get_or_insert_with(|| e.into());
        }
        Err(e) => {
            log::error!("backend shutdown failed: {e}");
            fatal.get_or_insert_with(|| anyhow::Error::new(e).context("backend shutdown failed"));
        }
    }

    let summary = conclude(
        IndexSummary {
            total_items,
            skipped: fetch_stats.skipped,
            fetched: fetch_stats.fetched,
            documents: feed_stats.documents,
            lines: feed_stats.lines,
            bytes: feed_stats.bytes,
            cancelled: cancel.is_cancelled(),
            elapsed: start.elapsed(),
        },
        progress,
    );

    match fatal {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}

/// Every termination path ends here: log the summary, then print the
/// confirmation lines the operator looks for.
fn conclude(summary: IndexSummary, progress: &ProgressContext) -> IndexSummary {
    summary.log();
    progress.println("Exited");
    progress.println("Index should not be corrupted");
    summary
}

/// Summary of one pipeline run.
#[derive(Debug, Default)]
pub struct IndexSummary {
    pub total_items: usize,
    pub skipped: usize,
    pub fetched: usize,
    pub documents: usize,
    pub lines: u64,
    pub bytes: u64,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl IndexSummary {
    pub fn log(&self) {
        log::info!("=== Ingestion Summary ===");
        log::info!(
            "items: {} total, {} skipped (already complete), {} fetched",
            self.total_items,
            self.skipped,
            self.fetched
        );
        log::info!(
            "indexed: {} documents, {} lines, {} MB in {:.1}s",
            self.documents,
            self.lines,
            self.bytes >> 20,
            self.elapsed.as_secs_f64()
        );
        if self.cancelled {
            log::info!("run was cancelled before the list was exhausted");
        }
    }
}
