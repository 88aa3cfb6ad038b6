//! Blocking oplog buffer
//!
//! Per OPLOG_BUFFER.md:
//! - FIFO between network ingestion (N producers) and the apply loop
//!   (exactly one consumer)
//! - Enqueue appends a slice atomically, in order
//! - Shutdown releases blocked waiters promptly; entries already buffered
//!   remain poppable so they can be inspected after a halt
//! - An optional capacity bound applies backpressure to producers;
//!   unbounded buffers never block producers

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use super::errors::{ApplierError, ApplierResult};
use crate::oplog::OplogEntry;

/// Bounded-or-unbounded blocking FIFO of oplog entries.
///
/// All state lives behind one mutex. `data_ready` wakes the consumer,
/// `space_available` wakes backpressured producers.
#[derive(Debug)]
pub struct OplogBuffer {
    inner: Mutex<BufferInner>,
    data_ready: Condvar,
    space_available: Condvar,
}

#[derive(Debug)]
struct BufferInner {
    entries: VecDeque<OplogEntry>,
    byte_size: usize,
    capacity: Option<usize>,
    shutdown: bool,
}

impl OplogBuffer {
    /// Create an unbounded buffer. Producers never block.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a buffer bounded to `capacity` entries.
    ///
    /// Producers block in `enqueue` until their whole slice fits.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::build(Some(capacity))
    }

    fn build(capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(BufferInner {
                entries: VecDeque::new(),
                byte_size: 0,
                capacity,
                shutdown: false,
            }),
            data_ready: Condvar::new(),
            space_available: Condvar::new(),
        }
    }

    /// Append a slice of entries atomically, in order.
    ///
    /// Blocks when a capacity bound is configured and the whole slice does
    /// not fit yet (all-or-nothing: a partial append would let the consumer
    /// observe a torn slice). Fails once the buffer is shut down, or
    /// immediately if the slice can never fit the configured capacity.
    pub fn enqueue(&self, entries: Vec<OplogEntry>) -> ApplierResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock().unwrap();
        if let Some(capacity) = inner.capacity {
            if entries.len() > capacity {
                return Err(ApplierError::CapacityExceeded {
                    requested: entries.len(),
                    capacity,
                });
            }
        }
        loop {
            if inner.shutdown {
                return Err(ApplierError::BufferShutdown);
            }
            match inner.capacity {
                Some(capacity) if inner.entries.len() + entries.len() > capacity => {
                    inner = self.space_available.wait(inner).unwrap();
                }
                _ => break,
            }
        }
        for entry in entries {
            inner.byte_size += entry.approximate_size();
            inner.entries.push_back(entry);
        }
        self.data_ready.notify_one();
        Ok(())
    }

    /// Return the front entry without removing it. Never blocks.
    pub fn peek(&self) -> Option<OplogEntry> {
        let inner = self.inner.lock().unwrap();
        inner.entries.front().cloned()
    }

    /// Remove and return the front entry. Never blocks.
    pub fn pop(&self) -> Option<OplogEntry> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.entries.pop_front();
        if let Some(ref entry) = entry {
            inner.byte_size -= entry.approximate_size();
            self.space_available.notify_all();
        }
        entry
    }

    /// Block the consumer until an entry is available, the timeout elapses,
    /// or the buffer shuts down. Returns whether data is available.
    ///
    /// Single-consumer: concurrent waiters are not required to interleave
    /// correctly.
    pub fn wait_for_data(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        loop {
            if !inner.entries.is_empty() {
                return true;
            }
            if inner.shutdown {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _timed_out) = self
                .data_ready
                .wait_timeout(inner, deadline - now)
                .unwrap();
            inner = guard;
        }
    }

    /// Mark the buffer closed and wake every blocked waiter.
    ///
    /// Subsequent enqueues fail; buffered entries remain peekable and
    /// poppable for diagnostics.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.shutdown = true;
        drop(inner);
        self.data_ready.notify_all();
        self.space_available.notify_all();
    }

    /// Whether the buffer has been shut down.
    pub fn is_shutdown(&self) -> bool {
        self.inner.lock().unwrap().shutdown
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Whether the buffer holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().entries.is_empty()
    }

    /// Cumulative approximate size of buffered entries.
    pub fn byte_size(&self) -> usize {
        self.inner.lock().unwrap().byte_size
    }
}

impl Default for OplogBuffer {
    fn default() -> Self {
        Self::new()
    }
}
