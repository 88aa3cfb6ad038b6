//! Batch builder
//!
//! Per APPLY_BATCHING.md:
//! - Batches are built greedily from the buffer front, in position order
//! - A batch is either one isolated entry, or groupable entries within
//!   the configured limits
//! - Certain entries must be applied in strict isolation:
//!   1. a grouped command unit of an already-prepared transaction
//!   2. any write to a view catalog (`<db>.system.views`)
//!   3. any write to the server-configuration namespace
//!   4. the commit of a prepared transaction
//! - Entries that do not fit the current batch are left in the buffer,
//!   never reordered or dropped
//! - For fixed buffer contents and limits the result is deterministic

use super::buffer::OplogBuffer;
use super::errors::ApplierResult;
use super::limits::BatchLimits;
use crate::oplog::{OpTime, OplogEntry};

/// An ordered group of entries applied together as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OplogBatch {
    entries: Vec<OplogEntry>,
    byte_size: usize,
}

impl OplogBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, entry: OplogEntry) {
        self.byte_size += entry.approximate_size();
        self.entries.push(entry);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cumulative approximate size of the entries.
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Entries in position order.
    pub fn entries(&self) -> &[OplogEntry] {
        &self.entries
    }

    /// Consume the batch, yielding its entries.
    pub fn into_entries(self) -> Vec<OplogEntry> {
        self.entries
    }

    /// Position of the first entry.
    pub fn first_op_time(&self) -> Option<OpTime> {
        self.entries.first().map(OplogEntry::op_time)
    }

    /// Position of the last entry.
    pub fn last_op_time(&self) -> Option<OpTime> {
        self.entries.last().map(OplogEntry::op_time)
    }
}

/// Whether an entry must form its own singleton batch.
///
/// Isolated entries are never merged with neighbors in either direction:
/// prepared transaction work (staged writes or their commit) must not
/// interleave with unrelated operations, and catalog/metadata namespaces
/// must take effect apart from ordinary data writes.
pub fn requires_isolation(entry: &OplogEntry) -> bool {
    if entry.is_command_apply_batch() && entry.is_prepared() {
        return true;
    }
    if entry.namespace().is_system_dot_views() {
        return true;
    }
    if entry.namespace().is_server_configuration() {
        return true;
    }
    if entry.is_commit_transaction() && entry.is_prepared() {
        return true;
    }
    false
}

/// Build the next applier batch from the buffer front.
///
/// Greedy single pass; never blocks. Returns an empty batch when the buffer
/// has nothing ready. An entry requiring isolation is returned alone when it
/// is at the front, and otherwise terminates the accumulated batch without
/// being consumed. An entry that would exceed the limits likewise terminates
/// the batch, except that an empty batch always takes the front entry so a
/// single oversized record cannot stall the pipeline.
pub fn get_next_applier_batch(
    buffer: &OplogBuffer,
    limits: &BatchLimits,
) -> ApplierResult<OplogBatch> {
    let mut batch = OplogBatch::new();

    while let Some(front) = buffer.peek() {
        if requires_isolation(&front) {
            if batch.is_empty() {
                if let Some(entry) = buffer.pop() {
                    batch.push(entry);
                }
            }
            // Non-empty batch: leave the entry as the sole content of the
            // next call.
            return Ok(batch);
        }

        if !batch.is_empty() {
            let over_ops = batch.len() + 1 > limits.max_ops();
            let over_bytes = batch.byte_size() + front.approximate_size() > limits.max_bytes();
            if over_ops || over_bytes {
                return Ok(batch);
            }
        }

        match buffer.pop() {
            Some(entry) => batch.push(entry),
            // Single-consumer contract makes this unreachable; terminate
            // cleanly rather than return a partial error.
            None => return Ok(batch),
        }
    }

    Ok(batch)
}
