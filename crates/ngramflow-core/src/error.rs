//! Common error type for the ingestion pipeline.

/// A failure that stops the run.
///
/// Transient retrieval failures never become a `PipelineError` — the
/// fetcher retries those internally. Everything here is fatal: backend
/// state after a refused write is undefined, and a completion that could
/// not be persisted cannot be trusted on resume.
#[derive(Debug)]
pub enum PipelineError {
    /// The backend process refused or failed to accept a line.
    Backend(std::io::Error),
    /// The backend exited with a non-zero status.
    BackendExit(i32),
    /// The completion ledger could not be appended to.
    Ledger(std::io::Error),
    /// Local I/O failure while streaming a document.
    Io(std::io::Error),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend(e) => write!(f, "backend write failed: {e}"),
            Self::BackendExit(code) => write!(f, "backend exited with status {code}"),
            Self::Ledger(e) => write!(f, "ledger append failed: {e}"),
            Self::Io(e) => write!(f, "IO: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(e) | Self::Ledger(e) | Self::Io(e) => Some(e),
            Self::BackendExit(_) => None,
        }
    }
}
