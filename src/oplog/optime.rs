//! Oplog position type
//!
//! Per OPLOG_MODEL.md:
//! - Every oplog entry carries a totally ordered log position
//! - Position = (timestamp, increment, term)
//! - Positions are unique per entry and never reused
//! - Apply order on a replica is exactly position order

use serde::{Deserialize, Serialize};
use std::fmt;

/// A totally ordered position in the operation log.
///
/// Ordering is lexicographic over (timestamp, increment, term), so the
/// derived `Ord` is the authoritative comparison. Two entries produced by
/// the same primary never share a position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OpTime {
    /// Seconds component of the logical timestamp
    pub timestamp: u64,
    /// Tie-breaker for operations sharing a timestamp
    pub increment: u32,
    /// Election term of the primary that logged the operation
    pub term: i64,
}

impl OpTime {
    /// Create a new position.
    pub fn new(timestamp: u64, increment: u32, term: i64) -> Self {
        Self {
            timestamp,
            increment,
            term,
        }
    }

    /// The null position, ordered before every real position.
    ///
    /// Used as the starting point before any operation has been applied.
    pub fn initial() -> Self {
        Self {
            timestamp: 0,
            increment: 0,
            term: -1,
        }
    }

    /// Check whether this is the null position.
    pub fn is_initial(&self) -> bool {
        *self == Self::initial()
    }
}

impl fmt::Display for OpTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ts={}.{} term={}", self.timestamp, self.increment, self.term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_by_timestamp() {
        assert!(OpTime::new(1, 1, 1) < OpTime::new(2, 1, 1));
    }

    #[test]
    fn test_ordering_by_increment_within_timestamp() {
        assert!(OpTime::new(5, 1, 1) < OpTime::new(5, 2, 1));
    }

    #[test]
    fn test_ordering_by_term_last() {
        assert!(OpTime::new(5, 1, 1) < OpTime::new(5, 1, 2));
        assert!(OpTime::new(5, 2, 1) > OpTime::new(5, 1, 2));
    }

    #[test]
    fn test_initial_precedes_all_real_positions() {
        let initial = OpTime::initial();
        assert!(initial.is_initial());
        assert!(initial < OpTime::new(0, 0, 0));
        assert!(initial < OpTime::new(1, 1, 1));
    }

    #[test]
    fn test_display() {
        let op_time = OpTime::new(42, 3, 7);
        assert_eq!(op_time.to_string(), "ts=42.3 term=7");
    }
}
