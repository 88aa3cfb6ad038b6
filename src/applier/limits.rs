//! Batch limits
//!
//! Per APPLY_BATCHING.md:
//! - Batch size MUST be explicitly bounded
//! - Bounds are configuration-defined and immutable per batch-building call
//! - A lone record larger than the limits still forms its own batch
//!   (forward progress over strict enforcement)

use super::errors::{ApplierError, ApplierResult};

/// Production default: cumulative batch size ceiling.
pub const DEFAULT_BATCH_LIMIT_BYTES: usize = 100 * 1024 * 1024;

/// Production default: batch operation-count ceiling.
pub const DEFAULT_BATCH_LIMIT_OPS: usize = 5000;

/// Ceilings for a single applier batch.
///
/// Validated at construction; batch building never re-validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    max_bytes: usize,
    max_ops: usize,
}

impl BatchLimits {
    /// Create limits, rejecting non-positive values.
    pub fn new(max_bytes: usize, max_ops: usize) -> ApplierResult<Self> {
        if max_bytes == 0 {
            return Err(ApplierError::InvalidLimits(
                "max_bytes must be positive".into(),
            ));
        }
        if max_ops == 0 {
            return Err(ApplierError::InvalidLimits(
                "max_ops must be positive".into(),
            ));
        }
        Ok(Self { max_bytes, max_ops })
    }

    /// Effectively unbounded limits.
    pub fn unbounded() -> Self {
        Self {
            max_bytes: usize::MAX,
            max_ops: usize::MAX,
        }
    }

    /// Byte ceiling.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Operation-count ceiling.
    pub fn max_ops(&self) -> usize {
        self.max_ops
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_BATCH_LIMIT_BYTES,
            max_ops: DEFAULT_BATCH_LIMIT_OPS,
        }
    }
}
