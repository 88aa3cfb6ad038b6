//! Applier orchestrator
//!
//! Per APPLY_LIFECYCLE.md:
//! - One applier owns one oplog buffer for its lifetime
//! - A single dedicated consumer thread runs the apply loop
//! - The apply strategy is injected, never subclassed
//! - Shutdown is cooperative: the loop checks state between batches and
//!   an in-flight apply call always completes
//! - A failed apply is fatal: the loop stops consuming and unapplied
//!   entries remain buffered for inspection

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use uuid::Uuid;

use super::batcher::{get_next_applier_batch, OplogBatch};
use super::buffer::OplogBuffer;
use super::errors::{ApplierError, ApplierResult};
use super::limits::BatchLimits;
use super::state::ApplierState;
use crate::observability::Logger;
use crate::oplog::{OpTime, OplogEntry};

/// How long the consumer sleeps in `wait_for_data` between shutdown checks.
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// Strategy applied to each completed batch.
///
/// Implementations own whatever storage handles or context they need;
/// the loop calls `apply` at most once per batch, sequentially, and treats
/// any error as fatal.
pub trait ApplyBatch: Send {
    /// Apply every entry of the batch in order, returning the log position
    /// reached.
    fn apply(&mut self, batch: &OplogBatch) -> ApplierResult<OpTime>;
}

/// Apply strategy that records what it saw and applies nothing.
#[derive(Debug, Default)]
pub struct NoopApply {
    batches_applied: usize,
    entries_applied: usize,
}

impl NoopApply {
    /// Create a fresh no-op strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches handed to this strategy so far.
    pub fn batches_applied(&self) -> usize {
        self.batches_applied
    }

    /// Entries handed to this strategy so far.
    pub fn entries_applied(&self) -> usize {
        self.entries_applied
    }
}

impl ApplyBatch for NoopApply {
    fn apply(&mut self, batch: &OplogBatch) -> ApplierResult<OpTime> {
        self.batches_applied += 1;
        self.entries_applied += batch.len();
        batch
            .last_op_time()
            .ok_or_else(|| ApplierError::apply_failed("empty batch handed to apply strategy"))
    }
}

/// State shared between the handle and the consumer thread.
#[derive(Debug)]
struct Shared {
    state: Mutex<ApplierState>,
    fatal_error: Mutex<Option<ApplierError>>,
    last_applied: Mutex<Option<OpTime>>,
}

/// Owns the buffer and drives the apply loop.
#[derive(Debug)]
pub struct OplogApplier {
    id: Uuid,
    buffer: Arc<OplogBuffer>,
    limits: BatchLimits,
    shared: Arc<Shared>,
    worker: Option<thread::JoinHandle<()>>,
}

impl OplogApplier {
    /// Create an applier owning `buffer`, batching under `limits`.
    pub fn new(buffer: OplogBuffer, limits: BatchLimits) -> Self {
        Self {
            id: Uuid::new_v4(),
            buffer: Arc::new(buffer),
            limits,
            shared: Arc::new(Shared {
                state: Mutex::new(ApplierState::new()),
                fatal_error: Mutex::new(None),
                last_applied: Mutex::new(None),
            }),
            worker: None,
        }
    }

    /// Instance identity, tagged on every log event.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ApplierState {
        *self.shared.state.lock().unwrap()
    }

    /// The owned buffer, for producer wiring and post-halt inspection.
    pub fn buffer(&self) -> &OplogBuffer {
        &self.buffer
    }

    /// Configured batch limits.
    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    /// Fatal apply error, if the loop stopped on one.
    pub fn fatal_error(&self) -> Option<ApplierError> {
        self.shared.fatal_error.lock().unwrap().clone()
    }

    /// Position reached by the last successful apply call.
    pub fn last_applied_op_time(&self) -> Option<OpTime> {
        *self.shared.last_applied.lock().unwrap()
    }

    /// Producer entry point: append entries to the buffer.
    ///
    /// Rejected once shutdown has begun. The slice must be strictly
    /// ascending by log position; a replica never re-feeds positions it
    /// already handed over.
    pub fn enqueue(&self, entries: Vec<OplogEntry>) -> ApplierResult<()> {
        let state = self.state();
        if !state.accepts_enqueue() {
            return Err(ApplierError::NotRunning(state.state_name()));
        }
        validate_ascending(&entries)?;
        self.buffer.enqueue(entries)
    }

    /// Start the apply loop on a dedicated consumer thread.
    pub fn start<A: ApplyBatch + 'static>(&mut self, strategy: A) -> ApplierResult<()> {
        {
            let mut state = self.shared.state.lock().unwrap();
            *state = state.start()?;
        }

        let applier_id = self.id.to_string();
        Logger::info(
            "applier_started",
            &[
                ("applier", applier_id.as_str()),
                ("max_bytes", &self.limits.max_bytes().to_string()),
                ("max_ops", &self.limits.max_ops().to_string()),
            ],
        );

        let buffer = Arc::clone(&self.buffer);
        let shared = Arc::clone(&self.shared);
        let limits = self.limits;
        self.worker = Some(thread::spawn(move || {
            run_loop(&applier_id, &buffer, &limits, &shared, strategy);
        }));
        Ok(())
    }

    /// Request shutdown.
    ///
    /// Transitions to ShuttingDown, closes the buffer (waking the consumer
    /// and any backpressured producers), and returns without waiting for
    /// the loop; the in-flight batch completes on its own.
    pub fn shutdown(&self) -> ApplierResult<()> {
        {
            let mut state = self.shared.state.lock().unwrap();
            *state = state.shutdown()?;
        }
        Logger::info(
            "applier_shutdown",
            &[
                ("applier", self.id.to_string().as_str()),
                ("buffered_entries", &self.buffer.len().to_string()),
            ],
        );
        self.buffer.shutdown();
        Ok(())
    }

    /// Wait for the apply loop to exit, transition to Stopped, and surface
    /// the fatal apply error if one occurred.
    ///
    /// Call `shutdown` first unless the loop has already halted on its own.
    pub fn join(&mut self) -> ApplierResult<()> {
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| ApplierError::apply_failed("apply loop thread panicked"))?;
        }
        {
            let mut state = self.shared.state.lock().unwrap();
            *state = state.stop()?;
        }
        match self.fatal_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Reject slices that are not strictly ascending by log position.
fn validate_ascending(entries: &[OplogEntry]) -> ApplierResult<()> {
    for pair in entries.windows(2) {
        if pair[1].op_time() <= pair[0].op_time() {
            return Err(ApplierError::OutOfOrder {
                previous: pair[0].op_time(),
                next: pair[1].op_time(),
            });
        }
    }
    Ok(())
}

/// The apply loop: wait, build a batch, hand it to the strategy, repeat.
///
/// Exits when shutdown begins (checked only between batches) or when the
/// strategy fails. Entries still buffered at exit are left in place.
fn run_loop<A: ApplyBatch>(
    applier_id: &str,
    buffer: &OplogBuffer,
    limits: &BatchLimits,
    shared: &Shared,
    mut strategy: A,
) {
    loop {
        if !shared.state.lock().unwrap().is_running() {
            break;
        }

        if !buffer.wait_for_data(IDLE_WAIT) {
            if buffer.is_shutdown() {
                break;
            }
            continue;
        }

        let batch = match get_next_applier_batch(buffer, limits) {
            Ok(batch) => batch,
            Err(err) => {
                record_fatal(applier_id, buffer, shared, err);
                break;
            }
        };
        if batch.is_empty() {
            continue;
        }

        match strategy.apply(&batch) {
            Ok(op_time) => {
                *shared.last_applied.lock().unwrap() = Some(op_time);
                Logger::info(
                    "batch_applied",
                    &[
                        ("applier", applier_id),
                        ("ops", &batch.len().to_string()),
                        ("bytes", &batch.byte_size().to_string()),
                        ("last_optime", &op_time.to_string()),
                    ],
                );
            }
            Err(err) => {
                record_fatal(applier_id, buffer, shared, err);
                break;
            }
        }
    }

    Logger::info("apply_loop_exited", &[("applier", applier_id)]);
}

/// Record a fatal loop error: log it, store it, begin shutdown, and close
/// the buffer so blocked producers are released. Buffered entries are
/// deliberately left in place for diagnostics.
fn record_fatal(applier_id: &str, buffer: &OplogBuffer, shared: &Shared, err: ApplierError) {
    Logger::error(
        "apply_failed",
        &[
            ("applier", applier_id),
            ("error", &err.to_string()),
            ("buffered_entries", &buffer.len().to_string()),
        ],
    );
    *shared.fatal_error.lock().unwrap() = Some(err);
    let mut state = shared.state.lock().unwrap();
    if let Ok(next) = state.shutdown() {
        *state = next;
    }
    drop(state);
    buffer.shutdown();
}
