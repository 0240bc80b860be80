//! Rate-limited workflow submission across a pool of concurrent workers.

use crate::aggregator::LatencyAggregator;
use crate::client::{OrchestratorClient, StartWorkflow};
use crate::BenchmarkError;
use arc_swap::ArcSwap;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use metrics::counter;
use std::num::NonZeroU32;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, warn};
use wfbench_core::{
    ConfigError, GeneratorSnapshot, RunConfig, WorkflowKind, RAMP_START_FRACTION, RAMP_TICK,
    WORKFLOWS_COMPLETED, WORKFLOWS_FAILED, WORKFLOWS_STARTED,
};

const COMPLETION_CHANNEL_DEPTH: usize = 1024;

/// Rates below this would produce degenerate pacing periods.
const MIN_PACED_RATE: f64 = 0.001;

/// Instantaneous target-rate schedule: linear from a near-zero fraction of
/// the target up to the full target over the ramp-up window, monotonically
/// non-decreasing, then held steady.
#[derive(Debug, Clone, Copy)]
pub struct RampSchedule {
    target: f64,
    ramp_up: Duration,
}

impl RampSchedule {
    pub fn new(target: f64, ramp_up: Duration) -> Self {
        Self { target, ramp_up }
    }

    pub fn rate_at(&self, elapsed: Duration) -> f64 {
        if self.ramp_up.is_zero() || elapsed >= self.ramp_up {
            return self.target;
        }
        let fraction = elapsed.as_secs_f64() / self.ramp_up.as_secs_f64();
        self.target * (RAMP_START_FRACTION + (1.0 - RAMP_START_FRACTION) * fraction)
    }

    pub fn target(&self) -> f64 {
        self.target
    }
}

#[derive(Clone)]
struct Counters {
    started: Arc<AtomicU64>,
    completed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl Counters {
    fn new() -> Self {
        Self {
            started: Arc::new(AtomicU64::new(0)),
            completed: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }
}

struct InFlight {
    handle: crate::client::WorkflowHandle,
    submitted_at: Instant,
}

/// Issues workflow-start calls at the scheduled aggregate rate, fanned out
/// across `worker_count` submission workers. Completions are observed by a
/// dedicated listener which records samples into the aggregator.
pub struct LoadGenerator<C> {
    client: Arc<C>,
    namespace: String,
    kind: WorkflowKind,
    worker_count: usize,
    ramp: RampSchedule,
    aggregator: Arc<LatencyAggregator>,
    counters: Counters,
    stop: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    started_at: Option<Instant>,
}

impl<C: OrchestratorClient> LoadGenerator<C> {
    pub fn new(client: Arc<C>, config: &RunConfig, aggregator: Arc<LatencyAggregator>) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            client,
            namespace: config.namespace.clone(),
            kind: config.workflow_kind,
            worker_count: config.worker_count,
            ramp: RampSchedule::new(config.target_rate, config.ramp_up),
            aggregator,
            counters: Counters::new(),
            stop,
            tasks: vec![],
            started_at: None,
        }
    }

    /// Begins submission and returns immediately. Fails fast, with no calls
    /// issued, on a non-positive rate or an empty worker pool.
    pub fn start(&mut self) -> Result<(), BenchmarkError> {
        if self.ramp.target() <= 0.0 {
            return Err(ConfigError::TargetRateOutOfRange(self.ramp.target()).into());
        }
        if self.worker_count < 1 {
            return Err(ConfigError::NoWorkers.into());
        }
        if self.started_at.is_some() {
            return Ok(());
        }
        self.started_at = Some(Instant::now());

        let (completions_tx, completions_rx) = mpsc::channel(COMPLETION_CHANNEL_DEPTH);
        self.tasks.push(tokio::spawn(completion_listener(
            self.client.clone(),
            self.aggregator.clone(),
            self.counters.clone(),
            completions_rx,
        )));

        let initial = self.ramp.rate_at(Duration::ZERO) / self.worker_count as f64;
        let mut limiters = Vec::with_capacity(self.worker_count);
        for worker_id in 0..self.worker_count {
            let limiter = Arc::new(ArcSwap::new(Arc::new(rate_limiter(initial))));
            limiters.push(limiter.clone());
            self.tasks.push(tokio::spawn(submission_worker(
                worker_id,
                self.client.clone(),
                self.namespace.clone(),
                self.kind,
                limiter,
                self.counters.clone(),
                completions_tx.clone(),
                self.stop.subscribe(),
            )));
        }
        drop(completions_tx);

        if !self.ramp.ramp_up.is_zero() {
            self.tasks.push(tokio::spawn(pacer(
                self.ramp,
                limiters,
                self.stop.subscribe(),
            )));
        }

        Ok(())
    }

    /// Signals all workers to cease issuing new starts. In-flight start
    /// calls and completion listening continue. Idempotent.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Consistent snapshot of the counters; never blocks on workers.
    pub fn stats(&self) -> GeneratorSnapshot {
        // Completions are read before starts so the snapshot never sees
        // more terminal workflows than submissions.
        let completed = self.counters.completed.load(Ordering::Relaxed);
        let failed = self.counters.failed.load(Ordering::Relaxed);
        let started = self.counters.started.load(Ordering::Relaxed);
        GeneratorSnapshot {
            started,
            completed,
            failed,
            elapsed: self
                .started_at
                .map(|at| at.elapsed())
                .unwrap_or(Duration::ZERO),
            target_rate: self.ramp.target(),
        }
    }

    pub fn ramp_schedule(&self) -> RampSchedule {
        self.ramp
    }

    /// Aborts all remaining tasks, including completion listening for
    /// workflows that never drained.
    pub fn shutdown(mut self) {
        self.stop();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Waits until the stop flag is raised. Never resolves if the sender is
/// gone without the flag being set.
pub(crate) async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn submission_worker<C: OrchestratorClient>(
    worker_id: usize,
    client: Arc<C>,
    namespace: String,
    kind: WorkflowKind,
    limiter: Arc<ArcSwap<DefaultDirectRateLimiter>>,
    counters: Counters,
    completions: mpsc::Sender<InFlight>,
    mut stop: watch::Receiver<bool>,
) {
    let mut seq = 0u64;
    loop {
        let limiter = limiter.load_full();
        tokio::select! {
            biased;
            _ = stopped(&mut stop) => break,
            _ = limiter.until_ready() => {}
        }

        let workflow_id = format!("{namespace}-w{worker_id}-{seq}");
        seq += 1;
        counters.started.fetch_add(1, Ordering::Relaxed);
        counter!(WORKFLOWS_STARTED).increment(1);

        let submitted_at = Instant::now();
        let request = StartWorkflow {
            namespace: namespace.clone(),
            workflow_id,
            kind,
        };
        match client.start_workflow(request).await {
            Ok(handle) => {
                if completions
                    .send(InFlight {
                        handle,
                        submitted_at,
                    })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(err) => {
                // Not retried here; transport-level retries are the
                // client's concern.
                counters.failed.fetch_add(1, Ordering::Relaxed);
                counter!(WORKFLOWS_FAILED).increment(1);
                warn!(worker_id, "workflow start failed: {err}");
            }
        }
    }
    debug!(worker_id, "submission worker stopped");
}

/// Raises the per-worker rate along the ramp schedule by swapping in fresh
/// limiters, then leaves the steady-state limiter untouched.
async fn pacer(
    ramp: RampSchedule,
    limiters: Vec<Arc<ArcSwap<DefaultDirectRateLimiter>>>,
    mut stop: watch::Receiver<bool>,
) {
    let started = Instant::now();
    let mut interval = tokio::time::interval(RAMP_TICK);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = stopped(&mut stop) => break,
            _ = interval.tick() => {}
        }
        let elapsed = started.elapsed();
        let per_worker = ramp.rate_at(elapsed) / limiters.len() as f64;
        for limiter in &limiters {
            limiter.store(Arc::new(rate_limiter(per_worker)));
        }
        if elapsed >= ramp.ramp_up {
            debug!("ramp-up complete, holding at target rate");
            break;
        }
    }
}

async fn completion_listener<C: OrchestratorClient>(
    client: Arc<C>,
    aggregator: Arc<LatencyAggregator>,
    counters: Counters,
    mut completions: mpsc::Receiver<InFlight>,
) {
    let mut observers = JoinSet::new();
    loop {
        tokio::select! {
            in_flight = completions.recv() => match in_flight {
                Some(in_flight) => {
                    observers.spawn(observe_completion(
                        client.clone(),
                        aggregator.clone(),
                        counters.clone(),
                        in_flight,
                    ));
                }
                None => break,
            },
            Some(_) = observers.join_next(), if !observers.is_empty() => {}
        }
    }
    // Channel closed: all workers are done submitting. Drain the rest.
    while observers.join_next().await.is_some() {}
    debug!("completion listener drained");
}

async fn observe_completion<C: OrchestratorClient>(
    client: Arc<C>,
    aggregator: Arc<LatencyAggregator>,
    counters: Counters,
    in_flight: InFlight,
) {
    let success = match client.await_workflow(&in_flight.handle).await {
        Ok(outcome) => outcome.is_success(),
        Err(err) => {
            debug!(
                workflow_id = %in_flight.handle.workflow_id,
                "completion watch failed: {err}"
            );
            false
        }
    };
    aggregator.record(in_flight.submitted_at.elapsed(), success);
    counters.completed.fetch_add(1, Ordering::Relaxed);
    counter!(WORKFLOWS_COMPLETED).increment(1);
}

fn rate_limiter(rate: f64) -> DefaultDirectRateLimiter {
    let period = Duration::from_secs_f64(1.0 / rate.max(MIN_PACED_RATE));
    RateLimiter::direct(
        Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::new(1).unwrap()))
            .allow_burst(NonZeroU32::new(1).unwrap()),
    )
}
