//! Applier Lifecycle Tests
//!
//! Per APPLY_LIFECYCLE.md:
//! - Created -> Running -> ShuttingDown -> Stopped, no state skipped
//! - Enqueue is rejected once shutdown begins
//! - A failed apply is fatal: the loop stops and unapplied entries
//!   remain buffered
//! - Shutdown is cooperative; the in-flight batch completes

use oplog_applier::applier::{
    ApplierError, ApplierResult, ApplierState, ApplyBatch, BatchLimits, NoopApply, OplogApplier,
    OplogBatch, OplogBuffer,
};
use oplog_applier::oplog::{Namespace, OpTime, OplogEntry};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn make_insert(t: u64) -> OplogEntry {
    OplogEntry::insert(
        OpTime::new(t, 1, 1),
        Namespace::new("test", "foo"),
        json!({"_id": t}),
    )
}

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Strategy that records every applied position.
struct RecordingApply {
    applied: Arc<Mutex<Vec<OpTime>>>,
}

impl ApplyBatch for RecordingApply {
    fn apply(&mut self, batch: &OplogBatch) -> ApplierResult<OpTime> {
        let mut applied = self.applied.lock().unwrap();
        for entry in batch.entries() {
            applied.push(entry.op_time());
        }
        batch
            .last_op_time()
            .ok_or_else(|| ApplierError::apply_failed("empty batch"))
    }
}

/// Strategy that fails on the first batch.
struct FailingApply;

impl ApplyBatch for FailingApply {
    fn apply(&mut self, _batch: &OplogBatch) -> ApplierResult<OpTime> {
        Err(ApplierError::apply_failed("storage rejected the batch"))
    }
}

// =============================================================================
// State Machine Tests
// =============================================================================

/// A new applier starts in Created and reaches Stopped through every state.
#[test]
fn test_full_lifecycle_states() {
    let mut applier = OplogApplier::new(OplogBuffer::new(), BatchLimits::unbounded());
    assert_eq!(applier.state(), ApplierState::Created);

    applier.start(NoopApply::new()).unwrap();
    assert_eq!(applier.state(), ApplierState::Running);

    applier.shutdown().unwrap();
    assert_eq!(applier.state(), ApplierState::ShuttingDown);

    applier.join().unwrap();
    assert_eq!(applier.state(), ApplierState::Stopped);
}

/// Starting twice is an illegal transition.
#[test]
fn test_start_twice_rejected() {
    let mut applier = OplogApplier::new(OplogBuffer::new(), BatchLimits::unbounded());
    applier.start(NoopApply::new()).unwrap();

    let result = applier.start(NoopApply::new());
    assert!(matches!(
        result,
        Err(ApplierError::IllegalTransition { from: "running", .. })
    ));

    applier.shutdown().unwrap();
    applier.join().unwrap();
}

/// Shutting down an applier that never ran skips Running and is rejected.
#[test]
fn test_shutdown_before_start_rejected() {
    let applier = OplogApplier::new(OplogBuffer::new(), BatchLimits::unbounded());
    assert!(matches!(
        applier.shutdown(),
        Err(ApplierError::IllegalTransition { from: "created", .. })
    ));
}

/// A second shutdown request is harmless.
#[test]
fn test_shutdown_idempotent() {
    let mut applier = OplogApplier::new(OplogBuffer::new(), BatchLimits::unbounded());
    applier.start(NoopApply::new()).unwrap();

    applier.shutdown().unwrap();
    applier.shutdown().unwrap();
    applier.join().unwrap();
}

// =============================================================================
// Enqueue Admission Tests
// =============================================================================

/// Enqueue works while Created and Running, and is rejected afterwards.
#[test]
fn test_enqueue_rejected_after_shutdown() {
    let mut applier = OplogApplier::new(OplogBuffer::new(), BatchLimits::unbounded());
    applier.enqueue(vec![make_insert(1)]).unwrap();

    applier.start(NoopApply::new()).unwrap();
    applier.enqueue(vec![make_insert(2)]).unwrap();

    applier.shutdown().unwrap();
    assert_eq!(
        applier.enqueue(vec![make_insert(3)]),
        Err(ApplierError::NotRunning("shutting_down"))
    );

    applier.join().unwrap();
    assert_eq!(
        applier.enqueue(vec![make_insert(3)]),
        Err(ApplierError::NotRunning("stopped"))
    );
}

// =============================================================================
// Apply Loop Tests
// =============================================================================

/// The loop drains enqueued entries through the strategy, in order.
#[test]
fn test_loop_applies_entries_in_order() {
    let applied = Arc::new(Mutex::new(Vec::new()));
    let mut applier = OplogApplier::new(OplogBuffer::new(), BatchLimits::unbounded());
    applier
        .start(RecordingApply {
            applied: Arc::clone(&applied),
        })
        .unwrap();

    applier
        .enqueue(vec![make_insert(1), make_insert(2), make_insert(3)])
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        applied.lock().unwrap().len() == 3
    }));
    assert_eq!(
        *applied.lock().unwrap(),
        vec![OpTime::new(1, 1, 1), OpTime::new(2, 1, 1), OpTime::new(3, 1, 1)]
    );

    applier.shutdown().unwrap();
    applier.join().unwrap();
    assert_eq!(applier.last_applied_op_time(), Some(OpTime::new(3, 1, 1)));
}

/// A failed apply stops the loop, records the error, and leaves the
/// unapplied entries in the buffer.
#[test]
fn test_apply_failure_is_fatal_and_preserves_buffer() {
    let mut applier = OplogApplier::new(OplogBuffer::new(), BatchLimits::new(usize::MAX, 1).unwrap());
    applier.start(FailingApply).unwrap();

    applier
        .enqueue(vec![make_insert(1), make_insert(2), make_insert(3)])
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        applier.fatal_error().is_some()
    }));
    assert_eq!(applier.state(), ApplierState::ShuttingDown);

    // First batch (one entry) was consumed and failed; the rest remain.
    assert_eq!(applier.buffer().len(), 2);
    assert_eq!(applier.last_applied_op_time(), None);

    let result = applier.join();
    assert_eq!(
        result,
        Err(ApplierError::apply_failed("storage rejected the batch"))
    );
    assert!(applier.fatal_error().unwrap().is_fatal());
}

/// Shutdown with an idle loop exits promptly.
#[test]
fn test_shutdown_wakes_idle_loop() {
    let mut applier = OplogApplier::new(OplogBuffer::new(), BatchLimits::unbounded());
    applier.start(NoopApply::new()).unwrap();

    let begin = Instant::now();
    applier.shutdown().unwrap();
    applier.join().unwrap();

    // Well under the idle wait times any retry; the waiter is woken.
    assert!(begin.elapsed() < Duration::from_secs(2));
}

/// Entries enqueued before start are applied once the loop begins.
#[test]
fn test_entries_staged_before_start_are_applied() {
    let applied = Arc::new(Mutex::new(Vec::new()));
    let mut applier = OplogApplier::new(OplogBuffer::new(), BatchLimits::unbounded());
    applier
        .enqueue(vec![make_insert(1), make_insert(2)])
        .unwrap();

    applier
        .start(RecordingApply {
            applied: Arc::clone(&applied),
        })
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        applied.lock().unwrap().len() == 2
    }));

    applier.shutdown().unwrap();
    applier.join().unwrap();
}
