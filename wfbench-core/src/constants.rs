use std::time::Duration;

/// Namespace prefix every benchmark run operates under.
pub const NAMESPACE_PREFIX: &str = "benchmark-";

/// Bounds on the aggregate submission rate (workflows per second).
pub const MIN_TARGET_RATE: f64 = 1.0;
pub const MAX_TARGET_RATE: f64 = 1000.0;

/// Bounds on the per-workflow activity count.
pub const MAX_ACTIVITY_COUNT: u32 = 100;

/// Fraction of the target rate the ramp-up schedule starts from.
pub const RAMP_START_FRACTION: f64 = 0.05;

/// How often the generator re-evaluates the ramp-up schedule.
pub const RAMP_TICK: Duration = Duration::from_millis(250);

/// Floor and cap for the derived completion-drain timeout.
pub const MIN_DRAIN_TIMEOUT: Duration = Duration::from_secs(60);
pub const MAX_DRAIN_TIMEOUT: Duration = Duration::from_secs(600);

/// How often the runner polls generator stats while draining.
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bounded timeout for the pre-flight health check.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Namespace creation retry budget.
pub const NAMESPACE_CREATE_ATTEMPTS: u32 = 3;
pub const NAMESPACE_CREATE_BACKOFF: Duration = Duration::from_millis(500);

/// Default pass/fail thresholds.
pub const DEFAULT_MAX_P99_LATENCY: Duration = Duration::from_millis(500);
pub const DEFAULT_MIN_THROUGHPUT: f64 = 1.0;
