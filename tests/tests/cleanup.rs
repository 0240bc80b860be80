mod utils;
#[allow(unused)]
use utils::*;

use mock_orchestrator::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use wfbench::cleanup::CleanupAgent;
use wfbench::prelude::*;

async fn seed_open_workflows(mock: &MockOrchestrator, namespace: &str, count: usize) {
    mock.create_namespace(namespace).await.unwrap();
    for i in 0..count {
        // Started but never awaited: stays open.
        mock.start_workflow(StartWorkflow {
            namespace: namespace.to_string(),
            workflow_id: format!("{namespace}-seed-{i}"),
            kind: WorkflowKind::Simple,
        })
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn cleanup_terminates_only_the_target_namespace() {
    init();
    let mock = MockOrchestrator::new();
    seed_open_workflows(&mock, "benchmark-test1", 50).await;
    seed_open_workflows(&mock, "prod-unrelated", 10).await;

    let agent = CleanupAgent::new(Arc::new(mock.clone()));
    let outcome = agent.cleanup("benchmark-test1").await.unwrap();

    assert_eq!(outcome.terminated, 50);
    assert!(outcome.failed.is_empty());
    assert_eq!(mock.open_workflow_count("benchmark-test1"), 0);
    assert_eq!(mock.open_workflow_count("prod-unrelated"), 10);
}

#[tokio::test]
async fn cleanup_of_an_empty_namespace_is_a_noop() {
    init();
    let mock = MockOrchestrator::new();
    seed_open_workflows(&mock, "benchmark-empty", 5).await;

    let agent = CleanupAgent::new(Arc::new(mock.clone()));
    assert_eq!(agent.cleanup("benchmark-empty").await.unwrap().terminated, 5);
    assert_eq!(agent.cleanup("benchmark-empty").await.unwrap().terminated, 0);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(60_000)]
async fn full_run_never_touches_unrelated_namespaces() {
    init();
    let mock = MockOrchestrator::new()
        .with_completion_latency(Duration::from_millis(2), Duration::ZERO);
    seed_open_workflows(&mock, "prod-unrelated", 10).await;

    let mut config = quick_config(WorkflowKind::Simple);
    config.test_duration = Duration::from_millis(800);
    config.ramp_up = Duration::from_millis(100);

    let runner = BenchmarkRunner::new(mock.clone(), config).unwrap();
    let namespace = runner.config().namespace.clone();
    runner.run().await.unwrap();

    assert!(namespace.starts_with("benchmark-"));
    assert_eq!(mock.open_workflow_count(&namespace), 0);
    assert_eq!(mock.open_workflow_count("prod-unrelated"), 10);
}
