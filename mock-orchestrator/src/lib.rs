//! In-memory workflow orchestration service for tests and local benchmark
//! runs. Completion latency is drawn from a skew-normal distribution and
//! shaped by the workflow kind; failures can be injected at every seam the
//! engine exercises.

use rand::Rng;
use rand_distr::{Distribution, SkewNormal};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;
use wfbench::prelude::*;
use wfbench_core::WorkflowKind;

const LATENCY_SKEW: f64 = 20.0;

#[derive(Debug, Clone)]
struct WorkflowRecord {
    run_id: String,
    kind: WorkflowKind,
    open: bool,
}

#[derive(Default)]
struct Namespace {
    workflows: HashMap<String, WorkflowRecord>,
}

struct Inner {
    healthy: AtomicBool,
    start_failure_rate: RwLock<f64>,
    workflow_failure_rate: RwLock<f64>,
    namespace_create_failures: AtomicU32,
    activity_executions: AtomicU64,
    run_sequence: AtomicU64,
    latency_mean: RwLock<Duration>,
    latency_std: RwLock<Duration>,
    namespaces: RwLock<HashMap<String, Namespace>>,
}

/// Cheap-to-clone handle on the shared mock state.
#[derive(Clone)]
pub struct MockOrchestrator {
    inner: Arc<Inner>,
}

impl Default for MockOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOrchestrator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                healthy: AtomicBool::new(true),
                start_failure_rate: RwLock::new(0.0),
                workflow_failure_rate: RwLock::new(0.0),
                namespace_create_failures: AtomicU32::new(0),
                activity_executions: AtomicU64::new(0),
                run_sequence: AtomicU64::new(0),
                latency_mean: RwLock::new(Duration::from_millis(10)),
                latency_std: RwLock::new(Duration::from_millis(3)),
                namespaces: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn with_completion_latency(self, mean: Duration, std: Duration) -> Self {
        *self.inner.latency_mean.write().unwrap() = mean;
        *self.inner.latency_std.write().unwrap() = std;
        self
    }

    /// Fraction of start calls rejected outright.
    pub fn with_start_failure_rate(self, rate: f64) -> Self {
        *self.inner.start_failure_rate.write().unwrap() = rate;
        self
    }

    /// Fraction of workflows that reach a failed terminal state.
    pub fn with_workflow_failure_rate(self, rate: f64) -> Self {
        *self.inner.workflow_failure_rate.write().unwrap() = rate;
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.inner.healthy.store(healthy, Ordering::Relaxed);
    }

    /// The next `count` namespace creations fail with a transport error.
    pub fn fail_next_namespace_creates(&self, count: u32) {
        self.inner
            .namespace_create_failures
            .store(count, Ordering::Relaxed);
    }

    /// Total activity executions across all completed workflows, the
    /// mock's equivalent of the service's own execution count.
    pub fn activity_executions(&self) -> u64 {
        self.inner.activity_executions.load(Ordering::Relaxed)
    }

    pub fn namespace_exists(&self, namespace: &str) -> bool {
        self.inner
            .namespaces
            .read()
            .unwrap()
            .contains_key(namespace)
    }

    pub fn open_workflow_count(&self, namespace: &str) -> usize {
        self.inner
            .namespaces
            .read()
            .unwrap()
            .get(namespace)
            .map_or(0, |ns| ns.workflows.values().filter(|w| w.open).count())
    }

    pub fn total_workflow_count(&self) -> usize {
        self.inner
            .namespaces
            .read()
            .unwrap()
            .values()
            .map(|ns| ns.workflows.len())
            .sum()
    }

    fn sample_latency(&self) -> Duration {
        let mean = self.inner.latency_mean.read().unwrap().as_secs_f64();
        let std = self.inner.latency_std.read().unwrap().as_secs_f64();
        if std <= 0.0 {
            return Duration::from_secs_f64(mean);
        }
        let skewed = SkewNormal::new(mean, std, LATENCY_SKEW).unwrap();
        let sampled: f64 = skewed.sample(&mut rand::thread_rng()).max(0.0);
        Duration::from_secs_f64(sampled)
    }

    fn completion_profile(&self, kind: WorkflowKind) -> (Duration, u64) {
        match kind {
            WorkflowKind::Simple => (self.sample_latency(), 0),
            WorkflowKind::MultiActivity { activities } => {
                let mut total = Duration::ZERO;
                for _ in 0..activities {
                    total += self.sample_latency();
                }
                (total, activities as u64)
            }
            WorkflowKind::Timer { fire_after_ms } => (Duration::from_millis(fire_after_ms), 0),
            WorkflowKind::ChildWorkflow { children } => {
                let mut total = Duration::ZERO;
                for _ in 0..children {
                    total += self.sample_latency();
                }
                (total, 0)
            }
        }
    }
}

impl OrchestratorClient for MockOrchestrator {
    async fn check_health(&self) -> Result<(), ClientError> {
        if self.inner.healthy.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(ClientError::Unavailable(
                "mock orchestrator marked unhealthy".to_string(),
            ))
        }
    }

    async fn describe_namespace(&self, namespace: &str) -> Result<bool, ClientError> {
        Ok(self.namespace_exists(namespace))
    }

    async fn create_namespace(&self, namespace: &str) -> Result<(), ClientError> {
        let remaining = self.inner.namespace_create_failures.load(Ordering::Relaxed);
        if remaining > 0 {
            self.inner
                .namespace_create_failures
                .store(remaining - 1, Ordering::Relaxed);
            return Err(ClientError::Transport(
                "injected namespace creation failure".to_string(),
            ));
        }
        self.inner
            .namespaces
            .write()
            .unwrap()
            .entry(namespace.to_string())
            .or_default();
        debug!(namespace, "namespace created");
        Ok(())
    }

    async fn start_workflow(&self, request: StartWorkflow) -> Result<WorkflowHandle, ClientError> {
        if !self.inner.healthy.load(Ordering::Relaxed) {
            return Err(ClientError::Unavailable(
                "mock orchestrator marked unhealthy".to_string(),
            ));
        }
        let failure_rate = *self.inner.start_failure_rate.read().unwrap();
        if failure_rate > 0.0 && rand::thread_rng().gen_bool(failure_rate) {
            return Err(ClientError::StartRejected(
                "injected start failure".to_string(),
            ));
        }

        let run_id = format!("run-{}", self.inner.run_sequence.fetch_add(1, Ordering::Relaxed));
        let mut namespaces = self.inner.namespaces.write().unwrap();
        let namespace = namespaces
            .get_mut(&request.namespace)
            .ok_or_else(|| ClientError::NamespaceNotFound(request.namespace.clone()))?;
        namespace.workflows.insert(
            request.workflow_id.clone(),
            WorkflowRecord {
                run_id: run_id.clone(),
                kind: request.kind,
                open: true,
            },
        );

        Ok(WorkflowHandle {
            namespace: request.namespace,
            workflow_id: request.workflow_id,
            run_id,
        })
    }

    async fn await_workflow(&self, handle: &WorkflowHandle) -> Result<WorkflowOutcome, ClientError> {
        let kind = {
            let namespaces = self.inner.namespaces.read().unwrap();
            namespaces
                .get(&handle.namespace)
                .and_then(|ns| ns.workflows.get(&handle.workflow_id))
                .map(|record| record.kind)
                .ok_or_else(|| ClientError::WorkflowNotFound(handle.workflow_id.clone()))?
        };

        let (duration, activities) = self.completion_profile(kind);
        tokio::time::sleep(duration).await;

        let mut namespaces = self.inner.namespaces.write().unwrap();
        let record = namespaces
            .get_mut(&handle.namespace)
            .and_then(|ns| ns.workflows.get_mut(&handle.workflow_id))
            .ok_or_else(|| ClientError::WorkflowNotFound(handle.workflow_id.clone()))?;
        if !record.open {
            // Terminated while we were waiting.
            return Ok(WorkflowOutcome::Failed);
        }
        record.open = false;
        self.inner
            .activity_executions
            .fetch_add(activities, Ordering::Relaxed);

        let failure_rate = *self.inner.workflow_failure_rate.read().unwrap();
        if failure_rate > 0.0 && rand::thread_rng().gen_bool(failure_rate) {
            Ok(WorkflowOutcome::Failed)
        } else {
            Ok(WorkflowOutcome::Completed)
        }
    }

    async fn list_open_workflows(&self, namespace: &str) -> Result<Vec<WorkflowHandle>, ClientError> {
        let namespaces = self.inner.namespaces.read().unwrap();
        let Some(ns) = namespaces.get(namespace) else {
            return Ok(vec![]);
        };
        Ok(ns
            .workflows
            .iter()
            .filter(|(_, record)| record.open)
            .map(|(workflow_id, record)| WorkflowHandle {
                namespace: namespace.to_string(),
                workflow_id: workflow_id.clone(),
                run_id: record.run_id.clone(),
            })
            .collect())
    }

    async fn terminate_workflow(&self, handle: &WorkflowHandle) -> Result<(), ClientError> {
        let mut namespaces = self.inner.namespaces.write().unwrap();
        let record = namespaces
            .get_mut(&handle.namespace)
            .and_then(|ns| ns.workflows.get_mut(&handle.workflow_id))
            .ok_or_else(|| ClientError::WorkflowNotFound(handle.workflow_id.clone()))?;
        record.open = false;
        Ok(())
    }
}

pub mod prelude {
    pub use crate::MockOrchestrator;
}
