//! Consumer stage: stream documents into the backend, record completions.

use ngramflow_core::relay::RelayQueue;
use ngramflow_core::{CancelToken, Document, IndexerProcess, Ledger, PipelineError, Telemetry};

#[derive(Debug, Default)]
pub struct FeederStats {
    pub documents: usize,
    pub lines: u64,
    pub bytes: u64,
}

/// Pop documents until the sentinel, streaming every line into the
/// backend and appending to the ledger after each fully consumed
/// document. Backend and ledger failures are fatal: the cancel token is
/// tripped and the queue cancelled so the fetcher stops too.
///
/// The document already popped is always finished before the sentinel is
/// observed — a quitting run never abandons a half-indexed item.
pub fn run_feeder(
    queue: &RelayQueue<Document>,
    indexer: &mut IndexerProcess,
    ledger: &mut Ledger,
    telemetry: &Telemetry,
    cancel: &CancelToken,
) -> Result<FeederStats, PipelineError> {
    let result = feed_loop(queue, indexer, ledger, telemetry);
    if let Err(e) = &result {
        log::error!("{e}");
        telemetry.end_indexing();
        cancel.cancel();
        queue.cancel();
    }
    result
}

fn feed_loop(
    queue: &RelayQueue<Document>,
    indexer: &mut IndexerProcess,
    ledger: &mut Ledger,
    telemetry: &Telemetry,
) -> Result<FeederStats, PipelineError> {
    let mut stats = FeederStats::default();
    let mut line = String::new();

    while let Some(mut doc) = queue.pop() {
        log::info!("Indexing contents of {}", doc.id());
        telemetry.begin_indexing();

        loop {
            line.clear();
            let n = doc.read_line(&mut line).map_err(PipelineError::Io)?;
            if n == 0 {
                break;
            }
            indexer
                .write_line(line.trim_end_matches(['\r', '\n']))
                .map_err(PipelineError::Backend)?;
            telemetry.set_indexed(doc.pos());
            stats.lines += 1;
        }

        telemetry.end_indexing();
        stats.documents += 1;
        stats.bytes += doc.pos();
        log::info!("Finished indexing {}", doc.id());

        // Only now is the item durably complete
        let id = doc.into_id();
        ledger.append(&id).map_err(PipelineError::Ledger)?;
    }

    Ok(stats)
}
