use crate::{
    DEFAULT_MAX_P99_LATENCY, DEFAULT_MIN_THROUGHPUT, MAX_ACTIVITY_COUNT, MAX_DRAIN_TIMEOUT,
    MAX_TARGET_RATE, MIN_DRAIN_TIMEOUT, MIN_TARGET_RATE, NAMESPACE_PREFIX,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Load shape for a run. A closed set: kind and parameter travel together
/// so an invalid combination is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WorkflowKind {
    Simple,
    MultiActivity { activities: u32 },
    Timer { fire_after_ms: u64 },
    ChildWorkflow { children: u32 },
}

impl WorkflowKind {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowKind::Simple => "simple",
            WorkflowKind::MultiActivity { .. } => "multi-activity",
            WorkflowKind::Timer { .. } => "timer",
            WorkflowKind::ChildWorkflow { .. } => "child-workflow",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowKind::Simple => write!(f, "simple"),
            WorkflowKind::MultiActivity { activities } => {
                write!(f, "multi-activity({activities})")
            }
            WorkflowKind::Timer { fire_after_ms } => write!(f, "timer({fire_after_ms}ms)"),
            WorkflowKind::ChildWorkflow { children } => write!(f, "child-workflow({children})"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("target rate {0} outside supported range {MIN_TARGET_RATE}..={MAX_TARGET_RATE}")]
    TargetRateOutOfRange(f64),

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("iterations must be at least 1")]
    NoIterations,

    #[error("test duration must be non-zero")]
    ZeroDuration,

    #[error("ramp-up {0:?} exceeds test duration {1:?}")]
    RampUpTooLong(Duration, Duration),

    #[error("activity count {0} outside supported range 1..={MAX_ACTIVITY_COUNT}")]
    ActivityCountOutOfRange(u32),

    #[error("child workflow count must be at least 1")]
    NoChildren,

    #[error("timer duration must be non-zero")]
    ZeroTimer,

    #[error("namespace {0:?} does not start with the {NAMESPACE_PREFIX:?} prefix")]
    BadNamespacePrefix(String),

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },
}

/// Immutable description of one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub workflow_kind: WorkflowKind,
    pub target_rate: f64,
    pub test_duration: Duration,
    pub ramp_up: Duration,
    pub worker_count: usize,
    pub iterations: u32,
    pub namespace: String,
    pub max_p99_latency: Duration,
    pub min_throughput: f64,
    pub drain_timeout: Option<Duration>,
}

impl RunConfig {
    pub fn new(workflow_kind: WorkflowKind) -> Self {
        Self {
            workflow_kind,
            target_rate: 10.0,
            test_duration: Duration::from_secs(60),
            ramp_up: Duration::from_secs(10),
            worker_count: 4,
            iterations: 1,
            namespace: generate_namespace(),
            max_p99_latency: DEFAULT_MAX_P99_LATENCY,
            min_throughput: DEFAULT_MIN_THROUGHPUT,
            drain_timeout: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TARGET_RATE..=MAX_TARGET_RATE).contains(&self.target_rate) {
            return Err(ConfigError::TargetRateOutOfRange(self.target_rate));
        }
        if self.worker_count < 1 {
            return Err(ConfigError::NoWorkers);
        }
        if self.iterations < 1 {
            return Err(ConfigError::NoIterations);
        }
        if self.test_duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if self.ramp_up > self.test_duration {
            return Err(ConfigError::RampUpTooLong(self.ramp_up, self.test_duration));
        }
        match self.workflow_kind {
            WorkflowKind::Simple => {}
            WorkflowKind::MultiActivity { activities } => {
                if activities == 0 || activities > MAX_ACTIVITY_COUNT {
                    return Err(ConfigError::ActivityCountOutOfRange(activities));
                }
            }
            WorkflowKind::Timer { fire_after_ms } => {
                if fire_after_ms == 0 {
                    return Err(ConfigError::ZeroTimer);
                }
            }
            WorkflowKind::ChildWorkflow { children } => {
                if children == 0 {
                    return Err(ConfigError::NoChildren);
                }
            }
        }
        if !self.namespace.starts_with(NAMESPACE_PREFIX) {
            return Err(ConfigError::BadNamespacePrefix(self.namespace.clone()));
        }
        Ok(())
    }

    /// Drain timeout, derived when not set explicitly: at least 60s, at
    /// least the test duration, capped at 10 minutes.
    pub fn completion_drain_timeout(&self) -> Duration {
        self.drain_timeout
            .unwrap_or_else(|| self.test_duration.max(MIN_DRAIN_TIMEOUT).min(MAX_DRAIN_TIMEOUT))
    }

    /// Fair share of the aggregate rate for one submission worker.
    pub fn per_worker_rate(&self) -> f64 {
        self.target_rate / self.worker_count as f64
    }

    /// Read the flat parameter set from `WFBENCH_*` environment variables.
    /// Only the workflow kind is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let kind_var = "WFBENCH_WORKFLOW_KIND";
        let kind_name =
            std::env::var(kind_var).map_err(|_| ConfigError::MissingEnv(kind_var))?;
        let workflow_kind = match kind_name.as_str() {
            "simple" => WorkflowKind::Simple,
            "multi-activity" => WorkflowKind::MultiActivity {
                activities: env_parse("WFBENCH_WORKFLOW_PARAM")?.unwrap_or(1),
            },
            "timer" => WorkflowKind::Timer {
                fire_after_ms: env_duration("WFBENCH_WORKFLOW_PARAM")?
                    .unwrap_or(Duration::from_secs(1))
                    .as_millis() as u64,
            },
            "child-workflow" => WorkflowKind::ChildWorkflow {
                children: env_parse("WFBENCH_WORKFLOW_PARAM")?.unwrap_or(1),
            },
            other => {
                return Err(ConfigError::InvalidEnv {
                    var: kind_var,
                    reason: format!("unknown workflow kind {other:?}"),
                })
            }
        };

        let mut config = RunConfig::new(workflow_kind);
        if let Some(rate) = env_parse("WFBENCH_TARGET_RATE")? {
            config.target_rate = rate;
        }
        if let Some(duration) = env_duration("WFBENCH_DURATION")? {
            config.test_duration = duration;
        }
        if let Some(ramp) = env_duration("WFBENCH_RAMP_UP")? {
            config.ramp_up = ramp;
        }
        if let Some(workers) = env_parse("WFBENCH_WORKERS")? {
            config.worker_count = workers;
        }
        if let Some(iterations) = env_parse("WFBENCH_ITERATIONS")? {
            config.iterations = iterations;
        }
        if let Ok(namespace) = std::env::var("WFBENCH_NAMESPACE") {
            config.namespace = namespace;
        }
        if let Some(ms) = env_parse::<u64>("WFBENCH_MAX_P99_MS")? {
            config.max_p99_latency = Duration::from_millis(ms);
        }
        if let Some(throughput) = env_parse("WFBENCH_MIN_THROUGHPUT")? {
            config.min_throughput = throughput;
        }
        if let Some(drain) = env_duration("WFBENCH_DRAIN_TIMEOUT")? {
            config.drain_timeout = Some(drain);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Generates `benchmark-<8 lowercase alphanumerics>`.
pub fn generate_namespace() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!("{NAMESPACE_PREFIX}{suffix}")
}

fn env_parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|err: T::Err| ConfigError::InvalidEnv {
                var,
                reason: err.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn env_duration(var: &'static str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => humantime::parse_duration(&raw)
            .map(Some)
            .map_err(|err| ConfigError::InvalidEnv {
                var,
                reason: err.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
