//! HTTP streaming with stall detection and spooling to a temporary file.
//!
//! Uses async reqwest internally with tokio::time::timeout for stall
//! detection, but presents a sync interface so the fetcher stays an
//! ordinary thread.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::task::Context;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, ReadBuf};

use crate::cancel::CancelToken;

/// Read timeout for stall detection (10 seconds with no data = stall)
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Copy chunk size while spooling a transfer to disk
const SPOOL_CHUNK: usize = 64 * 1024;

/// Error types for stream operations
#[derive(Debug)]
pub enum StreamError {
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for StreamError {}

impl StreamError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// True when the failure came from the operator pulling the plug,
    /// not from the network.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::Interrupted)
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Shared byte counter for progress tracking
pub type ByteCounter = Arc<AtomicU64>;

/// Open an HTTP GET transfer as a sync reader.
///
/// Returns the body reader plus the declared content length, when the
/// transport exposes one.
pub fn begin_download(url: &str) -> Result<(TimeoutReader, Option<u64>), StreamError> {
    let url = url.to_string();

    SHARED_RUNTIME.handle().block_on(async {
        let response = http_client()
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StreamError::from_reqwest(&e))?;

        let total_bytes = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());

        // Convert response body stream to AsyncRead
        let stream = response.bytes_stream();
        let async_reader = tokio_util::io::StreamReader::new(
            stream.map(|result| result.map_err(io::Error::other)),
        );

        Ok((TimeoutReader::new(Box::pin(async_reader)), total_bytes))
    })
}

/// Copy a transfer into an anonymous temporary file, counting bytes.
///
/// The counter is bumped as data arrives so the telemetry loop sees live
/// progress. The cancel token is checked between chunks; a cancelled
/// transfer returns `ErrorKind::Interrupted`. The returned file is rewound
/// to the start.
pub fn spool_to_temp(
    reader: &mut impl Read,
    counter: &ByteCounter,
    cancel: &CancelToken,
) -> io::Result<File> {
    let mut spool = tempfile::tempfile()?;
    let mut buf = [0u8; SPOOL_CHUNK];

    loop {
        if cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "cancelled"));
        }
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        spool.write_all(&buf[..n])?;
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    spool.seek(SeekFrom::Start(0))?;
    Ok(spool)
}

/// Async-to-sync bridge with read timeout.
///
/// Wraps an async reader and provides sync Read interface.
/// Each read operation has a timeout - if no data arrives within
/// READ_TIMEOUT, returns TimedOut error (which triggers retry).
pub struct TimeoutReader {
    inner: Pin<Box<dyn AsyncRead + Send + Sync>>,
}

impl TimeoutReader {
    fn new(inner: Pin<Box<dyn AsyncRead + Send + Sync>>) -> Self {
        Self { inner }
    }
}

impl Read for TimeoutReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SHARED_RUNTIME.handle().block_on(async {
            let read_future = async {
                let mut read_buf = ReadBuf::new(buf);
                std::future::poll_fn(|cx: &mut Context<'_>| {
                    Pin::as_mut(&mut self.inner).poll_read(cx, &mut read_buf)
                })
                .await?;
                Ok::<_, io::Error>(read_buf.filled().len())
            };

            match tokio::time::timeout(READ_TIMEOUT, read_future).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "read timeout (10s with no data)",
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn http_err(status: u16) -> StreamError {
        StreamError::Http {
            status: Some(status),
            message: "test".to_string(),
        }
    }

    #[test]
    fn display_http_with_status() {
        let err = http_err(404);
        assert_eq!(format!("{err}"), "HTTP 404: test");
    }

    #[test]
    fn display_http_without_status() {
        let err = StreamError::Http {
            status: None,
            message: "timeout".to_string(),
        };
        assert_eq!(format!("{err}"), "HTTP error: timeout");
    }

    #[test]
    fn display_io_error() {
        let err = StreamError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(format!("{err}").contains("IO error"));
    }

    #[test]
    fn cancelled_is_interrupted() {
        let err = StreamError::Io(io::Error::new(io::ErrorKind::Interrupted, "cancelled"));
        assert!(err.is_cancelled());
        assert!(!http_err(500).is_cancelled());
    }

    #[test]
    fn spool_counts_and_rewinds() {
        let data = vec![7u8; 200_000];
        let counter = Arc::new(AtomicU64::new(0));
        let cancel = CancelToken::new();

        let mut spool = spool_to_temp(&mut Cursor::new(&data), &counter, &cancel).unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), data.len() as u64);

        let mut back = Vec::new();
        spool.read_to_end(&mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn spool_observes_cancel() {
        let data = vec![1u8; 16];
        let counter = Arc::new(AtomicU64::new(0));
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = spool_to_temp(&mut Cursor::new(&data), &counter, &cancel).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
    }
}
