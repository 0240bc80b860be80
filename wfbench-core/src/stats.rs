use std::time::Duration;

/// Point-in-time view of the generator's counters.
///
/// Counters are monotonically increasing for the lifetime of one run;
/// `started >= completed + failed` always holds, with equality once the
/// drain phase finishes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorSnapshot {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub elapsed: Duration,
    pub target_rate: f64,
}

impl GeneratorSnapshot {
    /// Achieved submission rate, derived rather than stored.
    pub fn current_rate(&self) -> f64 {
        if self.elapsed.is_zero() {
            0.0
        } else {
            self.started as f64 / self.elapsed.as_secs_f64()
        }
    }

    pub fn in_flight(&self) -> u64 {
        self.started.saturating_sub(self.completed + self.failed)
    }

    pub fn drained(&self) -> bool {
        self.in_flight() == 0
    }
}

/// Frozen order statistics over successful completion latencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySnapshot {
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub max: Duration,
    pub count: u64,
}

impl LatencySnapshot {
    pub const ZERO: Self = Self {
        p50: Duration::ZERO,
        p95: Duration::ZERO,
        p99: Duration::ZERO,
        max: Duration::ZERO,
        count: 0,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_rate_is_starts_over_elapsed() {
        let snapshot = GeneratorSnapshot {
            started: 300,
            completed: 290,
            failed: 10,
            elapsed: Duration::from_secs(30),
            target_rate: 10.0,
        };
        assert!((snapshot.current_rate() - 10.0).abs() < 1e-9);
        assert!(snapshot.drained());
    }

    #[test]
    fn current_rate_guards_zero_elapsed() {
        let snapshot = GeneratorSnapshot {
            started: 5,
            completed: 0,
            failed: 0,
            elapsed: Duration::ZERO,
            target_rate: 10.0,
        };
        assert_eq!(snapshot.current_rate(), 0.0);
        assert_eq!(snapshot.in_flight(), 5);
        assert!(!snapshot.drained());
    }
}
