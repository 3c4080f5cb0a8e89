//! Cancellation token shared by the pipeline stages.
//!
//! A thin wrapper over `Arc<AtomicBool>` so the same flag can be tripped
//! by the interactive `q` command, a fatal feeder error, or a signal
//! handler (signal-hook registers directly against the inner flag).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag. Cheap to clone, checked at the top of
/// each work item, each retrieval attempt, and between transfer chunks.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Inner flag, for `signal_hook::flag::register`.
    pub fn flag(&self) -> Arc<AtomicBool> {
        self.0.clone()
    }
}
