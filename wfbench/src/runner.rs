//! End-to-end run lifecycle: gate, generate load, drain, report, clean up.

use crate::aggregator::LatencyAggregator;
use crate::cleanup::CleanupAgent;
use crate::client::OrchestratorClient;
use crate::gate::HealthGate;
use crate::generator::{stopped, LoadGenerator};
use crate::report::{RunResult, RunWindow};
use crate::BenchmarkError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{error, info, instrument, warn};
use wfbench_core::{RunConfig, DRAIN_POLL_INTERVAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Gating,
    Ramping,
    SteadyLoad,
    Draining,
    Reporting,
    CleaningUp,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Gating => "gating",
            RunState::Ramping => "ramping",
            RunState::SteadyLoad => "steady-load",
            RunState::Draining => "draining",
            RunState::Reporting => "reporting",
            RunState::CleaningUp => "cleaning-up",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Owns the run state machine. Each iteration gets a fresh generator and
/// aggregator; results are collected in order and never merged.
pub struct BenchmarkRunner<C> {
    client: Arc<C>,
    config: RunConfig,
    system_context: BTreeMap<String, String>,
}

impl<C: OrchestratorClient> BenchmarkRunner<C> {
    pub fn new(client: C, config: RunConfig) -> Result<Self, BenchmarkError> {
        config.validate()?;
        Ok(Self {
            client: Arc::new(client),
            config,
            system_context: BTreeMap::new(),
        })
    }

    /// Opaque key-value context carried through into every result record.
    pub fn with_system_context(mut self, system_context: BTreeMap<String, String>) -> Self {
        self.system_context = system_context;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<Vec<RunResult>, BenchmarkError> {
        let (_hold, shutdown) = watch::channel(false);
        self.run_until(shutdown).await
    }

    /// Runs all configured iterations, stopping early when the shutdown
    /// flag is raised. A raised flag mid-load still yields a partial result
    /// and a cleanup attempt.
    #[instrument(name = "benchmark", skip_all, fields(namespace = %self.config.namespace))]
    pub async fn run_until(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<RunResult>, BenchmarkError> {
        let mut results = Vec::with_capacity(self.config.iterations as usize);
        for iteration in 1..=self.config.iterations {
            if *shutdown.borrow() {
                info!(iteration, "shutdown requested; skipping remaining iterations");
                break;
            }
            info!(iteration, total = self.config.iterations, "starting iteration");
            match self.run_iteration(shutdown.clone()).await {
                Ok(result) => results.push(result),
                Err(err) if results.is_empty() => {
                    self.transition(RunState::Failed);
                    return Err(err);
                }
                Err(err) => {
                    // Earlier iterations already measured something; keep
                    // their results instead of discarding the whole run.
                    self.transition(RunState::Failed);
                    error!(
                        iteration,
                        completed_iterations = results.len(),
                        "iteration failed, returning earlier results: {err}"
                    );
                    break;
                }
            }
        }
        Ok(results)
    }

    async fn run_iteration(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunResult, BenchmarkError> {
        let gate = HealthGate::new(self.client.clone());
        self.transition(RunState::Gating);
        tokio::select! {
            res = gate.check_health() => res,
            _ = stopped(&mut shutdown) => Err(BenchmarkError::Cancelled),
        }?;
        tokio::select! {
            res = gate.ensure_namespace(&self.config.namespace) => res,
            _ = stopped(&mut shutdown) => Err(BenchmarkError::Cancelled),
        }?;

        let aggregator = Arc::new(LatencyAggregator::new());
        let mut generator =
            LoadGenerator::new(self.client.clone(), &self.config, aggregator.clone());

        let started_at = SystemTime::now();
        let load_started = Instant::now();
        self.transition(RunState::Ramping);
        generator.start()?;

        // The ramp is a prefix of the test window; the generator handles
        // the rate schedule, the runner just waits the window out.
        let mut cancelled = false;
        tokio::select! {
            _ = sleep(self.config.ramp_up) => self.transition(RunState::SteadyLoad),
            _ = stopped(&mut shutdown) => cancelled = true,
        }
        if !cancelled {
            let steady = self.config.test_duration.saturating_sub(self.config.ramp_up);
            tokio::select! {
                _ = sleep(steady) => {}
                _ = stopped(&mut shutdown) => cancelled = true,
            }
        }

        generator.stop();
        let submitted = generator.stats();
        info!(
            target_rate = submitted.target_rate,
            submission_rate = submitted.current_rate(),
            "load generation stopped"
        );
        let window = RunWindow {
            started_at,
            finished_at: SystemTime::now(),
            duration: load_started.elapsed(),
        };

        self.transition(RunState::Draining);
        let drain_complete = self.drain(&generator, &mut shutdown).await;

        self.transition(RunState::Reporting);
        let stats = generator.stats();
        let latency = aggregator.snapshot();
        generator.shutdown();
        let result = RunResult::build(
            &self.config,
            stats,
            latency,
            self.system_context.clone(),
            window,
            drain_complete,
        );

        // Unconditional once a namespace exists, including on cancellation;
        // orphaned test workflows are worse than a best-effort attempt.
        self.transition(RunState::CleaningUp);
        let agent = CleanupAgent::new(self.client.clone());
        if let Err(err) = agent.cleanup(&self.config.namespace).await {
            // Logged with remediation guidance; never changes the verdict.
            error!("cleanup failed: {err}");
        }

        self.transition(RunState::Done);
        if cancelled {
            info!("run cancelled mid-load; result covers the partial window");
        }
        Ok(result)
    }

    /// Waits for `started == completed + failed`, bounded by the drain
    /// timeout. A timeout is recorded on the result, not fatal.
    async fn drain(&self, generator: &LoadGenerator<C>, shutdown: &mut watch::Receiver<bool>) -> bool {
        let deadline = Instant::now() + self.config.completion_drain_timeout();
        loop {
            let stats = generator.stats();
            if stats.drained() {
                return true;
            }
            if Instant::now() >= deadline {
                warn!(
                    in_flight = stats.in_flight(),
                    "drain timed out; reporting with incomplete completion data"
                );
                return false;
            }
            tokio::select! {
                _ = sleep(DRAIN_POLL_INTERVAL) => {}
                _ = stopped(shutdown) => {
                    warn!("drain interrupted by shutdown");
                    return generator.stats().drained();
                }
            }
        }
    }

    fn transition(&self, state: RunState) {
        info!(%state, "state transition");
    }
}
