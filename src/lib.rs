//! oplog-applier - deterministic oplog batching and apply engine
//!
//! The replication path of a follower node: committed operations arrive
//! from upstream, wait in a blocking buffer, and are grouped into batches
//! at correctness-preserving boundaries before an injected strategy applies
//! them to storage.
//!
//! # Design Principles
//!
//! - Correct boundaries over big batches: prepared-transaction work and
//!   reserved catalog namespaces always apply in isolation
//! - Position order end to end, never reordered
//! - Deterministic batching: same buffer contents + same limits =
//!   same batches, on every node
//! - Explicit failure: a failed apply halts consumption and leaves the
//!   remaining entries in place for inspection

pub mod applier;
pub mod observability;
pub mod oplog;
