//! The seam to the external workflow orchestration service.
//!
//! Transport-level retry and timeout policy is the client's concern; the
//! engine never retries a failed start call itself.

use std::future::Future;
use thiserror::Error;
use wfbench_core::WorkflowKind;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("namespace {0:?} not found")]
    NamespaceNotFound(String),

    #[error("workflow {0:?} not found")]
    WorkflowNotFound(String),

    #[error("workflow start rejected: {0}")]
    StartRejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// A workflow-start request. The kind is fixed for a whole run; a worker
/// never mixes kinds.
#[derive(Debug, Clone)]
pub struct StartWorkflow {
    pub namespace: String,
    pub workflow_id: String,
    pub kind: WorkflowKind,
}

/// Identity of a started workflow: namespace + workflow ID + run ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkflowHandle {
    pub namespace: String,
    pub workflow_id: String,
    pub run_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Completed,
    Failed,
}

impl WorkflowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowOutcome::Completed)
    }
}

/// Operations the engine consumes from the orchestration service.
pub trait OrchestratorClient: Send + Sync + 'static {
    /// Health/ping call. Success means the service is accepting requests.
    fn check_health(&self) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Returns whether the namespace exists.
    fn describe_namespace(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<bool, ClientError>> + Send;

    fn create_namespace(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn start_workflow(
        &self,
        request: StartWorkflow,
    ) -> impl Future<Output = Result<WorkflowHandle, ClientError>> + Send;

    /// Resolves once the workflow reaches a terminal state.
    fn await_workflow(
        &self,
        handle: &WorkflowHandle,
    ) -> impl Future<Output = Result<WorkflowOutcome, ClientError>> + Send;

    fn list_open_workflows(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<Vec<WorkflowHandle>, ClientError>> + Send;

    fn terminate_workflow(
        &self,
        handle: &WorkflowHandle,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}
