//! Fixed-delay retry for retrieval attempts.
//!
//! A persistent network outage stalls the current work item until the
//! operator cancels; that is the intended behavior for an unattended
//! multi-day ingestion run. The delay is injectable so tests do not wait
//! a minute per attempt.

use std::time::Duration;

use crate::cancel::CancelToken;
use crate::stream::StreamError;

/// Retry policy for a retrieval attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Fixed wait between attempts. No backoff.
    pub delay: Duration,
    /// Attempt ceiling; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(60),
            max_attempts: None,
        }
    }
}

/// Sleep that wakes early when cancellation is requested.
pub fn sleep_with_cancel(duration: Duration, cancel: &CancelToken) {
    const TICK: Duration = Duration::from_millis(100);
    let mut remaining = duration;
    while !remaining.is_zero() && !cancel.is_cancelled() {
        let step = remaining.min(TICK);
        std::thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}

/// Retry `attempt_fn` until it succeeds, cancellation is requested, or
/// the attempt ceiling (if any) is hit.
///
/// Failures are logged as warnings unless they came from the run
/// shutting down, in which case they are suppressed. Returns `None` on
/// cancellation or exhaustion.
pub fn retry_fetch<T>(
    label: &str,
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut attempt_fn: impl FnMut() -> Result<T, StreamError>,
) -> Option<T> {
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        match attempt_fn() {
            Ok(v) => return Some(v),
            Err(e) => {
                if e.is_cancelled() {
                    // Operator-initiated teardown, not a failure worth reporting
                    return None;
                }
                attempt += 1;
                if let Some(max) = policy.max_attempts {
                    if attempt >= max {
                        log::error!("{label}: giving up after {attempt} attempts: {e}");
                        return None;
                    }
                }
                log::warn!("{label}: failed to retrieve: {e}");
                sleep_with_cancel(policy.delay, cancel);
                if cancel.is_cancelled() {
                    return None;
                }
                log::info!("{label}: retrying");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Instant;

    fn quick_policy(max_attempts: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_millis(10),
            max_attempts,
        }
    }

    fn transient() -> StreamError {
        StreamError::Http {
            status: Some(503),
            message: "unavailable".to_string(),
        }
    }

    fn interrupted() -> StreamError {
        StreamError::Io(io::Error::new(io::ErrorKind::Interrupted, "cancelled"))
    }

    #[test]
    fn returns_first_success() {
        let cancel = CancelToken::new();
        let result = retry_fetch("t", &quick_policy(None), &cancel, || Ok(42));
        assert_eq!(result, Some(42));
    }

    #[test]
    fn succeeds_after_failures() {
        let cancel = CancelToken::new();
        let mut calls = 0;
        let result = retry_fetch("t", &quick_policy(None), &cancel, || {
            calls += 1;
            if calls < 4 { Err(transient()) } else { Ok(calls) }
        });
        assert_eq!(result, Some(4));
        assert_eq!(calls, 4);
    }

    #[test]
    fn delay_elapses_between_attempts() {
        let cancel = CancelToken::new();
        let policy = RetryPolicy {
            delay: Duration::from_millis(30),
            max_attempts: None,
        };
        let mut calls = 0;
        let start = Instant::now();
        retry_fetch("t", &policy, &cancel, || {
            calls += 1;
            if calls < 3 { Err(transient()) } else { Ok(()) }
        });
        // Two failures -> at least two delay intervals
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn respects_attempt_ceiling() {
        let cancel = CancelToken::new();
        let mut calls = 0;
        let result: Option<()> = retry_fetch("t", &quick_policy(Some(3)), &cancel, || {
            calls += 1;
            Err(transient())
        });
        assert_eq!(result, None);
        assert_eq!(calls, 3);
    }

    #[test]
    fn cancelled_before_first_attempt() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut calls = 0;
        let result: Option<()> = retry_fetch("t", &quick_policy(None), &cancel, || {
            calls += 1;
            Err(transient())
        });
        assert_eq!(result, None);
        assert_eq!(calls, 0);
    }

    #[test]
    fn interrupted_transfer_stops_without_retrying() {
        // A transfer torn down by cancellation is not a retryable failure
        let cancel = CancelToken::new();
        let mut calls = 0;
        let result: Option<()> = retry_fetch("t", &quick_policy(None), &cancel, || {
            calls += 1;
            Err(interrupted())
        });
        assert_eq!(result, None);
        assert_eq!(calls, 1);
    }

    #[test]
    fn cancel_interrupts_retry_wait() {
        let cancel = CancelToken::new();
        let policy = RetryPolicy {
            delay: Duration::from_secs(60),
            max_attempts: None,
        };
        let token = cancel.clone();
        let waker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            token.cancel();
        });

        let start = Instant::now();
        let result: Option<()> = retry_fetch("t", &policy, &cancel, || Err(transient()));
        waker.join().unwrap();

        assert_eq!(result, None);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn sleep_with_cancel_full_duration() {
        let cancel = CancelToken::new();
        let start = Instant::now();
        sleep_with_cancel(Duration::from_millis(50), &cancel);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
