//! Terminates leftover benchmark workflows, scoped to one namespace.

use crate::client::{OrchestratorClient, WorkflowHandle};
use crate::BenchmarkError;
use metrics::counter;
use std::sync::Arc;
use tracing::{error, info, warn};
use wfbench_core::{CLEANUP_TERMINATED, NAMESPACE_PREFIX};

#[derive(Debug, Default)]
pub struct CleanupOutcome {
    pub terminated: u64,
    /// Workflows that could not be terminated; they need manual cleanup.
    pub failed: Vec<WorkflowHandle>,
}

pub struct CleanupAgent<C> {
    client: Arc<C>,
}

impl<C: OrchestratorClient> CleanupAgent<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Lists and terminates all open workflows in exactly `namespace`.
    /// Never enumerates any other namespace; non-benchmark names are
    /// refused outright. Idempotent: an already-empty namespace is a no-op.
    pub async fn cleanup(&self, namespace: &str) -> Result<CleanupOutcome, BenchmarkError> {
        if !namespace.starts_with(NAMESPACE_PREFIX) {
            return Err(BenchmarkError::CleanupIncomplete {
                namespace: namespace.to_string(),
                reason: format!("refusing to clean a namespace without the {NAMESPACE_PREFIX:?} prefix"),
            });
        }

        let open = self
            .client
            .list_open_workflows(namespace)
            .await
            .map_err(|err| BenchmarkError::CleanupIncomplete {
                namespace: namespace.to_string(),
                reason: format!("listing open workflows failed: {err}"),
            })?;

        if open.is_empty() {
            info!(namespace, "no open workflows to clean up");
            return Ok(CleanupOutcome::default());
        }

        info!(namespace, open = open.len(), "terminating leftover workflows");
        let mut outcome = CleanupOutcome::default();
        for handle in open {
            match self.client.terminate_workflow(&handle).await {
                Ok(()) => {
                    outcome.terminated += 1;
                    counter!(CLEANUP_TERMINATED).increment(1);
                }
                Err(err) => {
                    warn!(
                        namespace,
                        workflow_id = %handle.workflow_id,
                        "termination failed: {err}"
                    );
                    outcome.failed.push(handle);
                }
            }
        }

        if outcome.failed.is_empty() {
            info!(namespace, terminated = outcome.terminated, "cleanup finished");
        } else {
            let ids: Vec<&str> = outcome
                .failed
                .iter()
                .map(|handle| handle.workflow_id.as_str())
                .collect();
            error!(
                namespace,
                terminated = outcome.terminated,
                failed = outcome.failed.len(),
                "cleanup incomplete; terminate these workflows manually in namespace {namespace:?}: {ids:?}"
            );
        }

        Ok(outcome)
    }
}
