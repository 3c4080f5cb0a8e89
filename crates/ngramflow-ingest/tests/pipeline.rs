//! End-to-end pipeline tests against local fixtures and small Unix
//! utilities standing in for the indexing backend. No network involved.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use ngramflow_core::indexer::{BackendCommand, IndexerProcess, OutputMode};
use ngramflow_core::relay::RelayQueue;
use ngramflow_core::retry::RetryPolicy;
use ngramflow_core::{CancelToken, Document, Ledger, PipelineError, ProgressContext, Telemetry};
use ngramflow_ingest::feeder::run_feeder;
use ngramflow_ingest::{PipelineConfig, run_pipeline};

fn write_gz(path: &Path, text: &str) {
    let file = File::create(path).unwrap();
    let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    enc.write_all(text.as_bytes()).unwrap();
    enc.finish().unwrap();
}

fn test_config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        ledger_path: dir.path().join("paths_done"),
        queue_depth: 4,
        retry: RetryPolicy {
            delay: Duration::from_millis(10),
            max_attempts: Some(3),
        },
        shutdown_grace: Duration::from_secs(10),
        interactive: false,
    }
}

struct Fixtures {
    dir: TempDir,
    locators: Vec<String>,
}

/// Three gzip shards a.gz, b.gz, c.gz with known contents.
fn fixtures() -> Fixtures {
    let dir = TempDir::new().unwrap();
    let mut locators = Vec::new();
    for (name, text) in [
        ("a.gz", "apple 1900 10\napple 1901 12\n"),
        ("b.gz", "banana 1900 7\n"),
        ("c.gz", "cherry 1900 3\ncherry 1901 4\ncherry 1902 5\n"),
    ] {
        let path = dir.path().join(name);
        write_gz(&path, text);
        locators.push(path.to_str().unwrap().to_owned());
    }
    Fixtures { dir, locators }
}

/// Backend that copies its stdin into a file we can inspect afterwards.
fn capture_backend(out: &Path) -> BackendCommand {
    BackendCommand::new("sh").args(["-c", &format!("cat > '{}'", out.display())])
}

#[test]
fn full_run_indexes_everything_in_order() {
    let fx = fixtures();
    let config = test_config(&fx.dir);
    let out = fx.dir.path().join("indexed.txt");
    let progress = ProgressContext::new();

    let summary = run_pipeline(
        fx.locators.clone(),
        &capture_backend(&out),
        &config,
        &progress,
    )
    .unwrap();

    assert_eq!(summary.total_items, 3);
    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.documents, 3);
    assert_eq!(summary.lines, 6);

    // Every line of every shard reached the backend, in list order
    let indexed = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        indexed,
        "apple 1900 10\napple 1901 12\nbanana 1900 7\ncherry 1900 3\ncherry 1901 4\ncherry 1902 5\n"
    );

    // Ledger records completions in processing order
    let ledger = std::fs::read_to_string(&config.ledger_path).unwrap();
    let recorded: Vec<&str> = ledger.lines().collect();
    assert_eq!(recorded, fx.locators.iter().map(String::as_str).collect::<Vec<_>>());
}

#[test]
fn resume_processes_only_the_complement() {
    let fx = fixtures();
    let config = test_config(&fx.dir);
    let out = fx.dir.path().join("indexed.txt");

    // Seed the ledger: b.gz already done
    std::fs::write(&config.ledger_path, format!("{}\n", fx.locators[1])).unwrap();

    let summary = run_pipeline(
        fx.locators.clone(),
        &capture_backend(&out),
        &config,
        &ProgressContext::new(),
    )
    .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.documents, 2);

    // b.gz was never re-fetched: only a and c content reached the backend
    let indexed = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        indexed,
        "apple 1900 10\napple 1901 12\ncherry 1900 3\ncherry 1901 4\ncherry 1902 5\n"
    );

    // Final ledger: b retained from the initial state, then a, then c
    let ledger = std::fs::read_to_string(&config.ledger_path).unwrap();
    let recorded: Vec<&str> = ledger.lines().collect();
    assert_eq!(
        recorded,
        [
            fx.locators[1].as_str(),
            fx.locators[0].as_str(),
            fx.locators[2].as_str(),
        ]
    );
}

#[test]
fn fully_complete_list_is_a_noop() {
    let fx = fixtures();
    let config = test_config(&fx.dir);

    let mut seed = String::new();
    for locator in &fx.locators {
        seed.push_str(locator);
        seed.push('\n');
    }
    std::fs::write(&config.ledger_path, &seed).unwrap();

    // Backend command is never launched, so even a bogus one passes
    let summary = run_pipeline(
        fx.locators.clone(),
        &BackendCommand::new("/nonexistent/backend"),
        &config,
        &ProgressContext::new(),
    )
    .unwrap();

    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.fetched, 0);
    assert_eq!(std::fs::read_to_string(&config.ledger_path).unwrap(), seed);
}

#[test]
fn failed_backend_stops_the_run_without_recording_completions() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    // Bigger than a pipe buffer, so it cannot be absorbed by a backend
    // that is not reading
    let big = dir.path().join("big.gz");
    write_gz(&big, &"x 1900 1\n".repeat(50_000));
    let locators = vec![big.to_str().unwrap().to_owned()];

    // Exits immediately without reading stdin
    let backend = BackendCommand::new("true");
    let result = run_pipeline(locators.clone(), &backend, &config, &ProgressContext::new());

    assert!(result.is_err());
    let ledger = std::fs::read_to_string(&config.ledger_path).unwrap_or_default();
    assert!(
        !ledger.contains(&locators[0]),
        "failed item must not be recorded as complete"
    );
}

#[test]
fn nonzero_backend_exit_is_a_typed_error() {
    let fx = fixtures();
    let config = test_config(&fx.dir);

    // Consumes all input, then fails on exit
    let backend = BackendCommand::new("sh").args(["-c", "cat > /dev/null; exit 3"]);
    let err = run_pipeline(
        fx.locators.clone(),
        &backend,
        &config,
        &ProgressContext::new(),
    )
    .unwrap_err();

    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::BackendExit(code)) => assert_eq!(*code, 3),
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Reader that trickles bytes so the feeder is reliably mid-document
/// when cancellation arrives.
struct SlowRead {
    inner: Cursor<Vec<u8>>,
    delay: Duration,
}

impl Read for SlowRead {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::thread::sleep(self.delay);
        let n = buf.len().min(4);
        self.inner.read(&mut buf[..n])
    }
}

#[test]
fn quit_mid_document_finishes_that_document_only() {
    let dir = TempDir::new().unwrap();
    let ledger_path: PathBuf = dir.path().join("paths_done");

    let slow = SlowRead {
        inner: Cursor::new(b"slow 1900 1\nslow 1901 2\nslow 1902 3\n".to_vec()),
        delay: Duration::from_millis(10),
    };
    let current = Document::new(
        "current.gz",
        Box::new(std::io::BufReader::with_capacity(4, slow)),
        None,
    );
    let pending = Document::new(
        "pending.gz",
        Box::new(Cursor::new(b"never 1900 1\n".to_vec())),
        None,
    );

    let queue = Arc::new(RelayQueue::with_capacity(4));
    queue.push(current).unwrap();
    queue.push(pending).unwrap();

    let mut indexer =
        IndexerProcess::spawn(&BackendCommand::new("cat"), OutputMode::Discard).unwrap();
    let mut ledger = Ledger::load(&ledger_path).unwrap();
    let telemetry = Telemetry::new();
    let cancel = CancelToken::new();

    let feeder = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        std::thread::spawn(move || {
            let stats = run_feeder(&queue, &mut indexer, &mut ledger, &telemetry, &cancel);
            (indexer, stats)
        })
    };

    // Let the feeder get partway into the slow document, then quit
    std::thread::sleep(Duration::from_millis(30));
    cancel.cancel();
    queue.cancel();

    let (indexer, stats) = feeder.join().unwrap();
    let stats = stats.unwrap();

    // The in-flight document was finished and recorded; the pending one
    // was discarded without ever being indexed
    assert_eq!(stats.documents, 1);
    assert_eq!(stats.lines, 3);
    let recorded = std::fs::read_to_string(&ledger_path).unwrap();
    assert_eq!(recorded, "current.gz\n");

    indexer.shutdown(Duration::from_secs(10)).unwrap();
}
