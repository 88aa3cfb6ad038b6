//! Oplog application subsystem
//!
//! Per APPLY_LIFECYCLE.md and APPLY_BATCHING.md:
//! - Producers feed committed operations into a blocking FIFO buffer
//! - One consumer thread builds batches at correctness-preserving
//!   boundaries and hands them to an injected apply strategy
//! - Batch boundaries isolate prepared-transaction work and reserved
//!   catalog/metadata namespaces; everything else groups up to the limits
//! - Order is position order, end to end; no reordering across batches

mod applier;
mod batcher;
mod buffer;
mod errors;
mod limits;
mod state;

pub use applier::{ApplyBatch, NoopApply, OplogApplier};
pub use batcher::{get_next_applier_batch, requires_isolation, OplogBatch};
pub use buffer::OplogBuffer;
pub use errors::{ApplierError, ApplierResult};
pub use limits::{BatchLimits, DEFAULT_BATCH_LIMIT_BYTES, DEFAULT_BATCH_LIMIT_OPS};
pub use state::ApplierState;
