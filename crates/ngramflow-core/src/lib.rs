//! ngramflow Core - Common infrastructure for the corpus ingestion pipeline
//!
//! This crate provides the building blocks shared by the pipeline and the
//! CLI: HTTP streaming with gzip decompression, the completion ledger,
//! the bounded relay queue, the indexer subprocess adapter, retry policy,
//! cancellation, and telemetry.

pub mod cancel;
pub mod document;
pub mod error;
pub mod indexer;
pub mod ledger;
pub mod logging;
pub mod progress;
pub mod relay;
pub mod retry;
pub mod stream;
pub mod telemetry;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use document::Document;
pub use error::PipelineError;
pub use indexer::{BackendCommand, IndexerProcess, OutputMode};
pub use ledger::Ledger;
pub use logging::{IndicatifLogger, init_logging};
pub use progress::ProgressContext;
pub use relay::{QueueClosed, RelayQueue};
pub use retry::{RetryPolicy, retry_fetch, sleep_with_cancel};
pub use stream::{ByteCounter, SHARED_RUNTIME, StreamError, begin_download, http_client};
pub use telemetry::{Snapshot, Telemetry, status_line};
