//! Bounded FIFO relay queue between the fetcher and the feeder.
//!
//! Hand-rolled over `Mutex` + `Condvar`. Capacity is small (default 4):
//! a full queue blocks the producer, which is the pipeline's backpressure
//! point. Closing the queue is the sentinel — once closed and drained,
//! `pop` returns `None` and the consumer stops waiting. `cancel` clears
//! pending items first so a quitting run never waits on undelivered work.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Returned by `push` when the queue was closed while the producer was
/// blocked (or before it pushed). The item is dropped.
#[derive(Debug, PartialEq, Eq)]
pub struct QueueClosed;

struct Inner<T> {
    queue: VecDeque<T>,
    closed: bool,
}

pub struct RelayQueue<T> {
    inner: Mutex<Inner<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> RelayQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "relay queue capacity must be non-zero");
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Block until there is room, then enqueue.
    pub fn push(&self, item: T) -> Result<(), QueueClosed> {
        let mut inner = self.inner.lock().unwrap();
        while inner.queue.len() >= self.capacity && !inner.closed {
            inner = self.not_full.wait(inner).unwrap();
        }
        if inner.closed {
            return Err(QueueClosed);
        }
        inner.queue.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Block until an item or the sentinel arrives.
    ///
    /// `None` means the queue is closed and drained; the consumer should
    /// stop looping.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.queue.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Push the sentinel: no more items will arrive. Idempotent.
    /// Items already queued are still delivered.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Drop all pending items and close. Used on operator quit so the
    /// feeder only finishes the document it already holds.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.queue.clear();
        inner.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
