//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use ngramflow_core::RetryPolicy;

/// Tunables for one pipeline run. Every field has a sensible default;
/// tests inject short delays and non-interactive mode.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Completion ledger location.
    pub ledger_path: PathBuf,
    /// Relay queue capacity (documents buffered between the stages).
    pub queue_depth: usize,
    /// Retrieval retry policy.
    pub retry: RetryPolicy,
    /// How long the backend gets to exit after its input is closed.
    pub shutdown_grace: Duration,
    /// Listen for the interactive `q` command on stdin.
    pub interactive: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("paths_done"),
            queue_depth: 4,
            retry: RetryPolicy::default(),
            shutdown_grace: Duration::from_secs(30),
            interactive: true,
        }
    }
}
