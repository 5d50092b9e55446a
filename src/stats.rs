//! Pool observability: statistics snapshots and the drain report.
//!
//! [`PoolStats`] is a point-in-time snapshot of the pool's counters;
//! [`DrainReport`] is the outcome of a
//! [`drain_and_close_all`](crate::SessionPool::drain_and_close_all).

use crate::error::PoolError;

/// Snapshot of pool statistics at a point in time.
///
/// | Field | Description |
/// |-------|-------------|
/// | `ready` | Sessions queued, ready for acquisition |
/// | `leased` | Sessions currently held by callers |
/// | `in_flight` | Creation tasks still running |
/// | `failed` | Creations that failed (warm-up shortfall) |
/// | `target` | Total sessions requested via warm-up |
///
/// Values can change immediately after reading; treat them as
/// monitoring data, not synchronization.
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Sessions queued and ready for acquisition.
    pub ready: usize,
    /// Sessions currently held by callers.
    pub leased: usize,
    /// Creation tasks still running.
    pub in_flight: usize,
    /// Creations that failed; the warm-up shortfall.
    pub failed: usize,
    /// Total sessions requested via warm-up.
    pub target: usize,
}

impl PoolStats {
    /// Sessions the pool will end up short of its target:
    /// `target - (ready + leased + in_flight)`.
    #[inline]
    pub fn shortfall(&self) -> usize {
        self.target
            .saturating_sub(self.ready + self.leased + self.in_flight)
    }

    /// `true` once every requested creation has settled (succeeded or
    /// failed).
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.in_flight == 0
    }

    /// `true` while at least one session is ready for acquisition.
    #[inline]
    pub fn has_ready(&self) -> bool {
        self.ready > 0
    }
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PoolStats {{ ready: {}, leased: {}, in_flight: {}, failed: {}, target: {} }}",
            self.ready, self.leased, self.in_flight, self.failed, self.target
        )
    }
}

/// Outcome of a pool drain.
///
/// Individual close failures are collected here rather than aborting
/// the drain; the pool is considered closed once this report exists,
/// regardless of partial failures inside it.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Sessions closed successfully during the drain.
    pub closed: usize,
    /// Close failures, one entry per session that failed to close.
    pub failures: Vec<PoolError>,
}

impl DrainReport {
    /// `true` when every session closed cleanly.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of sessions that failed to close.
    #[inline]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

impl std::fmt::Display for DrainReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DrainReport {{ closed: {}, failed: {} }}",
            self.closed,
            self.failed()
        )
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_stats_shortfall() {
        let stats = PoolStats {
            ready: 2,
            leased: 1,
            in_flight: 0,
            failed: 1,
            target: 4,
        };

        assert_eq!(stats.shortfall(), 1);
        assert!(stats.is_settled());
        assert!(stats.has_ready());
    }

    /// Shortfall saturates rather than underflowing when releases push
    /// the pool above its original target.
    #[test]
    fn test_pool_stats_shortfall_saturating() {
        let stats = PoolStats {
            ready: 5,
            leased: 0,
            in_flight: 0,
            failed: 0,
            target: 4,
        };

        assert_eq!(stats.shortfall(), 0);
    }

    #[test]
    fn test_pool_stats_display() {
        let stats = PoolStats {
            ready: 3,
            leased: 1,
            in_flight: 0,
            failed: 0,
            target: 4,
        };

        assert_eq!(
            stats.to_string(),
            "PoolStats { ready: 3, leased: 1, in_flight: 0, failed: 0, target: 4 }"
        );
    }

    #[test]
    fn test_drain_report_clean() {
        let report = DrainReport {
            closed: 4,
            failures: Vec::new(),
        };

        assert!(report.is_clean());
        assert_eq!(report.failed(), 0);
        assert_eq!(report.to_string(), "DrainReport { closed: 4, failed: 0 }");
    }

    #[test]
    fn test_drain_report_with_failures() {
        let report = DrainReport {
            closed: 3,
            failures: vec![PoolError::CloseFailed {
                id: 9,
                reason: "gone".to_string(),
            }],
        };

        assert!(!report.is_clean());
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_drain_report_default() {
        let report = DrainReport::default();
        assert_eq!(report.closed, 0);
        assert!(report.is_clean());
    }
}
