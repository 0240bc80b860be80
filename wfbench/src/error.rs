use thiserror::Error;

/// Errors that escape a component boundary.
///
/// Only the pre-flight variants (`ClusterUnhealthy`,
/// `NamespaceCreationFailed`, `InvalidConfig`) abort a run before load is
/// generated; everything else is absorbed into the result record or logs.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] wfbench_core::ConfigError),

    #[error("cluster unhealthy: {0}")]
    ClusterUnhealthy(String),

    #[error("namespace creation failed for {namespace:?}: {reason}")]
    NamespaceCreationFailed { namespace: String, reason: String },

    #[error("cleanup incomplete in namespace {namespace:?}: {reason}")]
    CleanupIncomplete { namespace: String, reason: String },

    #[error("run cancelled before any measurement was taken")]
    Cancelled,
}
