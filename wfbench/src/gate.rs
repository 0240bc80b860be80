//! Pre-flight checks that block load generation against an unhealthy or
//! misconfigured target.

use crate::client::OrchestratorClient;
use crate::BenchmarkError;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};
use wfbench_core::{
    HEALTH_CHECK_TIMEOUT, NAMESPACE_CREATE_ATTEMPTS, NAMESPACE_CREATE_BACKOFF, NAMESPACE_PREFIX,
};

pub struct HealthGate<C> {
    client: Arc<C>,
}

impl<C: OrchestratorClient> HealthGate<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Bounded health/ping call. Failure means no workflow starts are
    /// issued for this run.
    pub async fn check_health(&self) -> Result<(), BenchmarkError> {
        match timeout(HEALTH_CHECK_TIMEOUT, self.client.check_health()).await {
            Ok(Ok(())) => {
                info!("orchestration service healthy");
                Ok(())
            }
            Ok(Err(err)) => Err(BenchmarkError::ClusterUnhealthy(err.to_string())),
            Err(_) => Err(BenchmarkError::ClusterUnhealthy(format!(
                "health check timed out after {HEALTH_CHECK_TIMEOUT:?}"
            ))),
        }
    }

    /// Idempotently creates the namespace, retrying transient failures with
    /// exponential backoff. Names without the `benchmark-` prefix are
    /// rejected outright.
    pub async fn ensure_namespace(&self, namespace: &str) -> Result<(), BenchmarkError> {
        if !namespace.starts_with(NAMESPACE_PREFIX) {
            return Err(BenchmarkError::NamespaceCreationFailed {
                namespace: namespace.to_string(),
                reason: format!("missing {NAMESPACE_PREFIX:?} prefix"),
            });
        }

        let mut backoff = NAMESPACE_CREATE_BACKOFF;
        let mut last_error = String::new();
        for attempt in 1..=NAMESPACE_CREATE_ATTEMPTS {
            match self.client.describe_namespace(namespace).await {
                Ok(true) => {
                    info!(namespace, "namespace already exists");
                    return Ok(());
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(namespace, attempt, "describe namespace failed: {err}");
                    last_error = err.to_string();
                    sleep(backoff).await;
                    backoff *= 2;
                    continue;
                }
            }

            match self.client.create_namespace(namespace).await {
                Ok(()) => {
                    info!(namespace, "namespace created");
                    return Ok(());
                }
                Err(err) => {
                    warn!(namespace, attempt, "namespace creation failed: {err}");
                    last_error = err.to_string();
                    if attempt < NAMESPACE_CREATE_ATTEMPTS {
                        sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(BenchmarkError::NamespaceCreationFailed {
            namespace: namespace.to_string(),
            reason: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, StartWorkflow, WorkflowHandle, WorkflowOutcome};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct FlakyClient {
        healthy: AtomicBool,
        create_failures: AtomicU32,
        created: AtomicBool,
    }

    impl FlakyClient {
        fn new(healthy: bool, create_failures: u32) -> Self {
            Self {
                healthy: AtomicBool::new(healthy),
                create_failures: AtomicU32::new(create_failures),
                created: AtomicBool::new(false),
            }
        }
    }

    impl OrchestratorClient for FlakyClient {
        async fn check_health(&self) -> Result<(), ClientError> {
            if self.healthy.load(Ordering::Relaxed) {
                Ok(())
            } else {
                Err(ClientError::Unavailable("down for test".to_string()))
            }
        }

        async fn describe_namespace(&self, _namespace: &str) -> Result<bool, ClientError> {
            Ok(self.created.load(Ordering::Relaxed))
        }

        async fn create_namespace(&self, _namespace: &str) -> Result<(), ClientError> {
            let remaining = self.create_failures.load(Ordering::Relaxed);
            if remaining > 0 {
                self.create_failures.store(remaining - 1, Ordering::Relaxed);
                return Err(ClientError::Transport("transient".to_string()));
            }
            self.created.store(true, Ordering::Relaxed);
            Ok(())
        }

        async fn start_workflow(
            &self,
            _request: StartWorkflow,
        ) -> Result<WorkflowHandle, ClientError> {
            unreachable!("gate tests never start workflows")
        }

        async fn await_workflow(
            &self,
            _handle: &WorkflowHandle,
        ) -> Result<WorkflowOutcome, ClientError> {
            unreachable!()
        }

        async fn list_open_workflows(
            &self,
            _namespace: &str,
        ) -> Result<Vec<WorkflowHandle>, ClientError> {
            Ok(vec![])
        }

        async fn terminate_workflow(&self, _handle: &WorkflowHandle) -> Result<(), ClientError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn healthy_target_passes() {
        let gate = HealthGate::new(Arc::new(FlakyClient::new(true, 0)));
        assert!(gate.check_health().await.is_ok());
    }

    #[tokio::test]
    async fn unhealthy_target_fails() {
        let gate = HealthGate::new(Arc::new(FlakyClient::new(false, 0)));
        assert!(matches!(
            gate.check_health().await,
            Err(BenchmarkError::ClusterUnhealthy(_))
        ));
    }

    #[tokio::test]
    async fn namespace_creation_retries_transient_failures() {
        let gate = HealthGate::new(Arc::new(FlakyClient::new(true, 2)));
        assert!(gate.ensure_namespace("benchmark-retry").await.is_ok());
    }

    #[tokio::test]
    async fn namespace_creation_gives_up_after_budget() {
        let gate = HealthGate::new(Arc::new(FlakyClient::new(true, 10)));
        assert!(matches!(
            gate.ensure_namespace("benchmark-doomed").await,
            Err(BenchmarkError::NamespaceCreationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn ensure_namespace_is_idempotent() {
        let gate = HealthGate::new(Arc::new(FlakyClient::new(true, 0)));
        gate.ensure_namespace("benchmark-twice").await.unwrap();
        gate.ensure_namespace("benchmark-twice").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_namespace_without_prefix() {
        let gate = HealthGate::new(Arc::new(FlakyClient::new(true, 0)));
        assert!(matches!(
            gate.ensure_namespace("prod-unrelated").await,
            Err(BenchmarkError::NamespaceCreationFailed { .. })
        ));
    }
}
