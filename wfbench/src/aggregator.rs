//! Lock-free collection of completion samples and on-demand percentiles.

use metrics::histogram;
use metrics_util::AtomicBucket;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use wfbench_core::{LatencySnapshot, WORKFLOW_LATENCY};

/// One completion observation.
#[derive(Debug, Clone, Copy)]
struct LatencySample {
    duration: Duration,
    success: bool,
}

/// Concurrency-safe latency store.
///
/// Recording is O(1) amortized and never takes a lock shared with other
/// writers. Snapshots are computed exactly from the raw sample set by
/// nearest-rank selection (`index = ceil(p * n) - 1`, clamped), over
/// successful completions only. The rank method is fixed so p99 values are
/// comparable across runs.
pub struct LatencyAggregator {
    samples: AtomicBucket<LatencySample>,
    success: AtomicU64,
    failure: AtomicU64,
}

impl Default for LatencyAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyAggregator {
    pub fn new() -> Self {
        Self {
            samples: AtomicBucket::new(),
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
        }
    }

    /// Safe to call from any number of concurrent workers.
    pub fn record(&self, duration: Duration, success: bool) {
        self.samples.push(LatencySample { duration, success });
        if success {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure.fetch_add(1, Ordering::Relaxed);
        }
        histogram!(WORKFLOW_LATENCY).record(duration.as_secs_f64());
    }

    /// Order statistics over everything recorded so far. Non-destructive;
    /// samples keep accumulating after the call.
    pub fn snapshot(&self) -> LatencySnapshot {
        let mut durations = Vec::with_capacity(self.success.load(Ordering::Relaxed) as usize);
        self.samples.data_with(|block| {
            durations.extend(block.iter().filter(|s| s.success).map(|s| s.duration));
        });

        if durations.is_empty() {
            return LatencySnapshot::ZERO;
        }
        durations.sort_unstable();

        LatencySnapshot {
            p50: nearest_rank(&durations, 0.50),
            p95: nearest_rank(&durations, 0.95),
            p99: nearest_rank(&durations, 0.99),
            max: durations[durations.len() - 1],
            count: durations.len() as u64,
        }
    }

    /// Successful and failed sample counts.
    pub fn counts(&self) -> (u64, u64) {
        (
            self.success.load(Ordering::Relaxed),
            self.failure.load(Ordering::Relaxed),
        )
    }
}

fn nearest_rank(sorted: &[Duration], quantile: f64) -> Duration {
    let n = sorted.len();
    let rank = (quantile * n as f64).ceil() as usize;
    sorted[rank.clamp(1, n) - 1]
}
