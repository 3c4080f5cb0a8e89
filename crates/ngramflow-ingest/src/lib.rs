//! ngramflow Ingest - the resumable streaming ingestion pipeline
//!
//! Wires the core building blocks into the two-stage pipeline: a fetcher
//! retrieving and decompressing corpus shards with indefinite retry, and
//! a feeder streaming their lines into the indexing backend, connected by
//! a bounded relay queue and recorded in the completion ledger.

pub mod config;
pub mod feeder;
pub mod fetcher;
pub mod runner;
pub mod worklist;

pub use config::PipelineConfig;
pub use feeder::{FeederStats, run_feeder};
pub use fetcher::{FetchStats, run_fetcher};
pub use runner::{IndexSummary, run_pipeline};
pub use worklist::{BooksTemplate, WorkItem};
