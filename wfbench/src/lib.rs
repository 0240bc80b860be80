//! Benchmark load-generation and measurement engine for a durable-workflow
//! orchestration service.
//!
//! The engine drives workflow-start traffic at a ramped target rate against
//! an [`client::OrchestratorClient`], aggregates completion latencies
//! lock-free, and renders a pass/fail verdict against configurable p99 and
//! throughput thresholds.

pub mod aggregator;
pub mod cleanup;
pub mod client;
pub mod gate;
pub mod generator;
pub mod report;
pub mod runner;

mod error;

pub use error::BenchmarkError;

pub mod prelude {
    pub use crate::aggregator::LatencyAggregator;
    pub use crate::cleanup::CleanupAgent;
    pub use crate::client::{
        ClientError, OrchestratorClient, StartWorkflow, WorkflowHandle, WorkflowOutcome,
    };
    pub use crate::report::RunResult;
    pub use crate::runner::BenchmarkRunner;
    pub use crate::BenchmarkError;
    pub use wfbench_core::{RunConfig, WorkflowKind};
}
