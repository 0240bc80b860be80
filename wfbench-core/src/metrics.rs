//! Metric names exposed on the Prometheus scrape surface.

pub const WORKFLOWS_STARTED: &str = "wfbench_workflows_started";
pub const WORKFLOWS_COMPLETED: &str = "wfbench_workflows_completed";
pub const WORKFLOWS_FAILED: &str = "wfbench_workflows_failed";
pub const WORKFLOW_LATENCY: &str = "wfbench_workflow_latency_seconds";
pub const CLEANUP_TERMINATED: &str = "wfbench_cleanup_terminated";
