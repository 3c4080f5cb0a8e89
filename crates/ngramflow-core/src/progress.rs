//! Status-line rendering for TTY and non-TTY environments.
//!
//! TTY mode: one indicatif-managed line, overwritten in place, with log
//! output printed above it. Non-TTY mode: no live line, logs only.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Central progress context owning the managed status line.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: std::io::stderr().is_terminal(),
        }
    }

    /// The single pipeline status line.
    ///
    /// Update with `set_message` each telemetry tick; call `finish_and_clear`
    /// on shutdown. Hidden (no-op) when not attached to a terminal.
    pub fn status_line(&self) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(0));
        pb.set_style(ProgressStyle::with_template("{wide_msg}").expect("invalid template"));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Print a line above the managed status line (avoids interference).
    ///
    /// Use this instead of `println!` while the status line is live.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.is_tty {
            let _ = self.multi.println(msg);
        } else {
            println!("{}", msg.as_ref());
        }
    }

    /// Whether running in TTY mode.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for the log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}
