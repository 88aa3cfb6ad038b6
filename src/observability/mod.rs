//! Observability
//!
//! Structured logging for the apply pipeline. Logging is passive: it never
//! changes batching or lifecycle behavior.

mod logger;

pub use logger::{Logger, Severity};
