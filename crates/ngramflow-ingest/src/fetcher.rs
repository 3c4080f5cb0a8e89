//! Producer stage: retrieve, decompress, and enqueue work items.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::atomic::Ordering;

use flate2::read::GzDecoder;

use ngramflow_core::relay::RelayQueue;
use ngramflow_core::retry::{RetryPolicy, retry_fetch};
use ngramflow_core::stream::{self, StreamError};
use ngramflow_core::{CancelToken, Document, Telemetry};

use crate::worklist::WorkItem;

/// Buffer size over the decompressing reader (256KB)
const LINE_BUF_SIZE: usize = 256 * 1024;

#[derive(Debug, Default)]
pub struct FetchStats {
    pub fetched: usize,
    pub skipped: usize,
}

/// Walk the work-item list in order, skipping completed items, retrying
/// failed retrievals indefinitely, and pushing each retrieved document
/// onto the relay queue (blocking when it is full — the backpressure
/// point). Closes the queue when the list is exhausted or cancellation is
/// requested.
pub fn run_fetcher(
    items: &[WorkItem],
    queue: &RelayQueue<Document>,
    telemetry: &Telemetry,
    policy: &RetryPolicy,
    cancel: &CancelToken,
) -> FetchStats {
    let mut stats = FetchStats::default();

    for item in items {
        if cancel.is_cancelled() {
            break;
        }
        if item.done {
            stats.skipped += 1;
            continue;
        }

        log::info!("Retrieving {}", item.locator);
        let doc = retry_fetch(&item.locator, policy, cancel, || {
            open_document(&item.locator, telemetry, cancel)
        });
        telemetry.end_download();

        match doc {
            Some(doc) => {
                stats.fetched += 1;
                if queue.push(doc).is_err() {
                    break;
                }
            }
            None if cancel.is_cancelled() => break,
            // Attempt ceiling hit (injected policy): not completed, not
            // recorded — the item stays eligible for the next run
            None => continue,
        }
    }

    queue.close();
    stats
}

/// Retrieve one work item end to end.
///
/// Remote locators are spooled to an anonymous temp file so a mid-transfer
/// failure retries the whole item and nothing half-fetched ever reaches
/// the queue. The download counter ticks while the transfer streams.
fn open_document(
    locator: &str,
    telemetry: &Telemetry,
    cancel: &CancelToken,
) -> Result<Document, StreamError> {
    let counter = telemetry.download_counter();

    let (source, total) = if is_remote(locator) {
        let (mut body, total) = stream::begin_download(locator)?;
        telemetry.begin_download(total);
        let spool = stream::spool_to_temp(&mut body, &counter, cancel)?;
        (spool, total)
    } else {
        let file = File::open(locator)?;
        let len = file.metadata()?.len();
        telemetry.begin_download(Some(len));
        counter.store(len, Ordering::Relaxed);
        (file, Some(len))
    };

    let reader: Box<dyn BufRead + Send> = if locator.ends_with(".gz") {
        Box::new(BufReader::with_capacity(
            LINE_BUF_SIZE,
            GzDecoder::new(source),
        ))
    } else {
        Box::new(BufReader::new(source))
    };

    Ok(Document::new(locator, reader, total))
}

fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}
