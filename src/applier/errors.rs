//! Applier error types

use thiserror::Error;

use crate::oplog::OpTime;

/// Result type for applier operations
pub type ApplierResult<T> = Result<T, ApplierError>;

/// Errors surfaced by the buffer, the batch builder, and the apply loop
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApplierError {
    // ==================
    // Buffer Errors
    // ==================
    /// Buffer was shut down; no further entries are accepted
    #[error("oplog buffer is shut down")]
    BufferShutdown,

    /// An enqueued slice can never fit a bounded buffer
    #[error("cannot enqueue {requested} entries into buffer with capacity {capacity}")]
    CapacityExceeded {
        /// Entries in the rejected slice
        requested: usize,
        /// Total configured capacity
        capacity: usize,
    },

    // ==================
    // Configuration Errors
    // ==================
    /// Batch limits failed construction-time validation
    #[error("invalid batch limits: {0}")]
    InvalidLimits(String),

    // ==================
    // Ingest Errors
    // ==================
    /// Enqueued entries were not strictly ascending by log position
    #[error("out-of-order enqueue: {next} does not follow {previous}")]
    OutOfOrder {
        /// Position of the preceding entry
        previous: OpTime,
        /// Offending position
        next: OpTime,
    },

    // ==================
    // Lifecycle Errors
    // ==================
    /// State machine rejected a transition
    #[error("illegal applier transition: {from} -> {to}")]
    IllegalTransition {
        /// State the applier was in
        from: &'static str,
        /// Requested state
        to: &'static str,
    },

    /// Operation requires a running applier
    #[error("applier is {0}, operation rejected")]
    NotRunning(&'static str),

    // ==================
    // Apply Errors
    // ==================
    /// The injected apply strategy failed; fatal to the run loop
    #[error("batch apply failed: {0}")]
    ApplyFailed(String),
}

impl ApplierError {
    /// Create an apply failure from any displayable cause.
    pub fn apply_failed(cause: impl std::fmt::Display) -> Self {
        Self::ApplyFailed(cause.to_string())
    }

    /// Whether this error stops the apply loop.
    ///
    /// Only apply failures are fatal; buffer shutdown and lifecycle
    /// rejections are ordinary control flow for callers.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ApplyFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_failure_is_fatal() {
        assert!(ApplierError::apply_failed("disk full").is_fatal());
    }

    #[test]
    fn test_control_flow_errors_are_not_fatal() {
        assert!(!ApplierError::BufferShutdown.is_fatal());
        assert!(!ApplierError::NotRunning("stopped").is_fatal());
        assert!(!ApplierError::InvalidLimits("zero".into()).is_fatal());
    }

    #[test]
    fn test_out_of_order_display_names_both_positions() {
        let err = ApplierError::OutOfOrder {
            previous: OpTime::new(2, 1, 1),
            next: OpTime::new(1, 1, 1),
        };
        let msg = err.to_string();
        assert!(msg.contains("ts=2.1"));
        assert!(msg.contains("ts=1.1"));
    }
}
