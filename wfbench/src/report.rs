//! Assembles the run record, evaluates thresholds, and renders JSON and a
//! human-readable summary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime};
use wfbench_core::{GeneratorSnapshot, LatencySnapshot, RunConfig};

/// Wall-clock boundaries of the submission window. The drain phase is not
/// part of `duration`, so the achieved rate reflects the load window.
#[derive(Debug, Clone, Copy)]
pub struct RunWindow {
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub workflow_kind: String,
    pub target_rate: f64,
    pub duration_secs: f64,
    pub ramp_up_secs: f64,
    pub worker_count: usize,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyMillis {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
    pub samples: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub duration_secs: f64,
    pub actual_rate: f64,
    pub latency: LatencyMillis,
}

/// Immutable record of one benchmark iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(with = "rfc3339")]
    pub timestamp: SystemTime,
    #[serde(with = "rfc3339")]
    pub completed_at: SystemTime,
    pub config: ConfigSummary,
    pub results: Measurements,
    pub system: BTreeMap<String, String>,
    pub passed: bool,
    pub failure_reasons: Vec<String>,
    pub drain_complete: bool,
}

impl RunResult {
    /// Pure function of its inputs; no side effects.
    pub fn build(
        config: &RunConfig,
        stats: GeneratorSnapshot,
        latency: LatencySnapshot,
        system: BTreeMap<String, String>,
        window: RunWindow,
        drain_complete: bool,
    ) -> Self {
        let duration_secs = window.duration.as_secs_f64();
        let actual_rate = if duration_secs > 0.0 {
            stats.completed as f64 / duration_secs
        } else {
            0.0
        };

        let (passed, failure_reasons) = evaluate_thresholds(
            latency.p99,
            actual_rate,
            config.max_p99_latency,
            config.min_throughput,
        );

        Self {
            timestamp: window.started_at,
            completed_at: window.finished_at,
            config: ConfigSummary {
                workflow_kind: config.workflow_kind.to_string(),
                target_rate: config.target_rate,
                duration_secs: config.test_duration.as_secs_f64(),
                ramp_up_secs: config.ramp_up.as_secs_f64(),
                worker_count: config.worker_count,
                namespace: config.namespace.clone(),
            },
            results: Measurements {
                started: stats.started,
                completed: stats.completed,
                failed: stats.failed,
                duration_secs,
                actual_rate,
                latency: LatencyMillis {
                    p50_ms: millis(latency.p50),
                    p95_ms: millis(latency.p95),
                    p99_ms: millis(latency.p99),
                    max_ms: millis(latency.max),
                    samples: latency.count,
                },
            },
            system,
            passed,
            failure_reasons,
            drain_complete,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Fixed-format multi-line report for direct display.
    pub fn to_summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== workflow benchmark run ===")?;
        writeln!(
            f,
            "started:     {}",
            humantime::format_rfc3339_seconds(self.timestamp)
        )?;
        writeln!(f, "workflow:    {}", self.config.workflow_kind)?;
        writeln!(
            f,
            "target rate: {:.2} wf/s over {:.1}s (ramp-up {:.1}s), {} workers",
            self.config.target_rate,
            self.config.duration_secs,
            self.config.ramp_up_secs,
            self.config.worker_count,
        )?;
        writeln!(f, "namespace:   {}", self.config.namespace)?;
        writeln!(
            f,
            "workflows:   started={} completed={} failed={}",
            self.results.started, self.results.completed, self.results.failed
        )?;
        writeln!(f, "actual rate: {:.2} wf/s", self.results.actual_rate)?;
        writeln!(
            f,
            "latency:     p50={:.1}ms p95={:.1}ms p99={:.1}ms max={:.1}ms ({} samples)",
            self.results.latency.p50_ms,
            self.results.latency.p95_ms,
            self.results.latency.p99_ms,
            self.results.latency.max_ms,
            self.results.latency.samples,
        )?;
        writeln!(
            f,
            "drain:       {}",
            if self.drain_complete {
                "complete"
            } else {
                "incomplete (some workflows did not finish before the timeout)"
            }
        )?;
        for (key, value) in &self.system {
            writeln!(f, "system:      {key}={value}")?;
        }
        if self.passed {
            write!(f, "verdict:     PASSED")?;
        } else {
            writeln!(f, "verdict:     FAILED")?;
            for reason in &self.failure_reasons {
                writeln!(f, "  - {reason}")?;
            }
        }
        Ok(())
    }
}

/// Both clauses are evaluated independently; every violated clause gets its
/// own reason string.
pub fn evaluate_thresholds(
    p99: Duration,
    actual_rate: f64,
    max_p99: Duration,
    min_throughput: f64,
) -> (bool, Vec<String>) {
    let mut reasons = vec![];
    if p99 > max_p99 {
        reasons.push(format!(
            "p99 latency {}ms exceeds threshold {}ms",
            p99.as_millis(),
            max_p99.as_millis()
        ));
    }
    if actual_rate < min_throughput {
        reasons.push(format!(
            "throughput {actual_rate:.2} wf/s below threshold {min_throughput:.2} wf/s"
        ));
    }
    (reasons.is_empty(), reasons)
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1e3
}

mod rfc3339 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::SystemTime;

    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        humantime::format_rfc3339_nanos(*time)
            .to_string()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_rfc3339(&raw).map_err(serde::de::Error::custom)
    }
}
