//! Shared throughput counters and the combined status line.
//!
//! Each counter has exactly one writer (fetcher or feeder); the renderer
//! only loads. Relaxed ordering is fine — a status line a tick stale is
//! acceptable.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::stream::ByteCounter;

/// Width of each half of the combined status line.
const HALF_WIDTH: usize = 60;

pub struct Telemetry {
    downloaded: ByteCounter,
    download_total: AtomicU64,
    indexed: AtomicU64,
    downloading: AtomicBool,
    indexing: AtomicBool,
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            downloaded: ByteCounter::default(),
            download_total: AtomicU64::new(0),
            indexed: AtomicU64::new(0),
            downloading: AtomicBool::new(false),
            indexing: AtomicBool::new(false),
        }
    }

    /// Counter the transfer loop bumps as compressed bytes arrive.
    pub fn download_counter(&self) -> ByteCounter {
        self.downloaded.clone()
    }

    /// Mark a transfer as started. `total` is the declared content
    /// length; 0 / unknown suppresses the percentage display.
    pub fn begin_download(&self, total: Option<u64>) {
        self.downloaded.store(0, Ordering::Relaxed);
        self.download_total
            .store(total.unwrap_or(0), Ordering::Relaxed);
        self.downloading.store(true, Ordering::Relaxed);
    }

    pub fn end_download(&self) {
        self.downloading.store(false, Ordering::Relaxed);
    }

    /// Mark a document as being streamed to the backend. The uncompressed
    /// size is unknown while streaming, so there is no total here.
    pub fn begin_indexing(&self) {
        self.indexed.store(0, Ordering::Relaxed);
        self.indexing.store(true, Ordering::Relaxed);
    }

    pub fn set_indexed(&self, bytes: u64) {
        self.indexed.store(bytes, Ordering::Relaxed);
    }

    pub fn end_indexing(&self) {
        self.indexing.store(false, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            downloaded: self.downloaded.load(Ordering::Relaxed),
            download_total: self.download_total.load(Ordering::Relaxed),
            indexed: self.indexed.load(Ordering::Relaxed),
            downloading: self.downloading.load(Ordering::Relaxed),
            indexing: self.indexing.load(Ordering::Relaxed),
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters, taken once per renderer tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub downloaded: u64,
    pub download_total: u64,
    pub indexed: u64,
    pub downloading: bool,
    pub indexing: bool,
}

/// Render the combined status line from two consecutive snapshots.
///
/// Left half is the download stage, right half the indexing stage; each
/// reads either "idle" or "N MB (P%) @ R KB/s". Rates are instantaneous
/// deltas over the elapsed tick. A counter reset between ticks (new
/// document) shows as a zero rate for one tick, not a negative one.
pub fn status_line(prev: &Snapshot, cur: &Snapshot, elapsed: Duration) -> String {
    let left = if cur.downloading {
        let rate = rate_kbs(prev.downloaded, cur.downloaded, elapsed);
        match cur.download_total {
            0 => format!("Downloaded {} MB @ {:.2} KB/s", cur.downloaded >> 20, rate),
            total => format!(
                "Downloaded {} MB ({:.2}%) @ {:.2} KB/s",
                cur.downloaded >> 20,
                100.0 * cur.downloaded as f64 / total as f64,
                rate
            ),
        }
    } else {
        "Downloader idle".to_string()
    };

    let right = if cur.indexing {
        let rate = rate_kbs(prev.indexed, cur.indexed, elapsed);
        format!("Indexed {} MB @ {:.2} KB/s", cur.indexed >> 20, rate)
    } else {
        "Indexer idle".to_string()
    };

    format!("{:<w$} {}", clip(&left), clip(&right), w = HALF_WIDTH)
}

fn rate_kbs(prev: u64, cur: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    cur.saturating_sub(prev) as f64 / secs / 1024.0
}

fn clip(s: &str) -> &str {
    match s.char_indices().nth(HALF_WIDTH) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
