//! Applier lifecycle state machine
//!
//! Per APPLY_LIFECYCLE.md:
//! - Created -> Running -> ShuttingDown -> Stopped
//! - No transition skips a state
//! - Enqueue is accepted only before shutdown begins
//! - All lifecycle logic uses an explicit state machine with
//!   enumerated states

use super::errors::{ApplierError, ApplierResult};

/// Lifecycle state of an applier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplierState {
    /// Constructed, apply loop not yet started.
    /// Enqueue is accepted so a feed can be staged before start.
    Created,

    /// Apply loop is consuming batches.
    Running,

    /// Shutdown requested or fatal apply error recorded.
    /// The in-flight batch (if any) completes; no new batch begins.
    ShuttingDown,

    /// Apply loop has exited and been joined.
    Stopped,
}

impl ApplierState {
    /// Initial state.
    pub fn new() -> Self {
        Self::Created
    }

    /// Transition on start. Valid only from Created.
    pub fn start(self) -> ApplierResult<Self> {
        match self {
            Self::Created => Ok(Self::Running),
            other => Err(ApplierError::IllegalTransition {
                from: other.state_name(),
                to: Self::Running.state_name(),
            }),
        }
    }

    /// Transition on shutdown request or fatal error.
    ///
    /// Valid from Running; idempotent from ShuttingDown (a second shutdown
    /// request is harmless). Created and Stopped reject: shutting down an
    /// applier that never ran skips the Running state.
    pub fn shutdown(self) -> ApplierResult<Self> {
        match self {
            Self::Running | Self::ShuttingDown => Ok(Self::ShuttingDown),
            other => Err(ApplierError::IllegalTransition {
                from: other.state_name(),
                to: Self::ShuttingDown.state_name(),
            }),
        }
    }

    /// Transition once the loop has exited and been joined.
    ///
    /// Valid from ShuttingDown; idempotent from Stopped.
    pub fn stop(self) -> ApplierResult<Self> {
        match self {
            Self::ShuttingDown | Self::Stopped => Ok(Self::Stopped),
            other => Err(ApplierError::IllegalTransition {
                from: other.state_name(),
                to: Self::Stopped.state_name(),
            }),
        }
    }

    /// Whether the apply loop is consuming.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        matches!(self, Self::ShuttingDown)
    }

    /// Whether the loop has fully stopped.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Whether producers may enqueue.
    pub fn accepts_enqueue(&self) -> bool {
        matches!(self, Self::Created | Self::Running)
    }

    /// State name for observability.
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }
}

impl Default for ApplierState {
    fn default() -> Self {
        Self::new()
    }
}
