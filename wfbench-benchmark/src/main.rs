use metrics_exporter_prometheus::PrometheusBuilder;
use mock_orchestrator::prelude::*;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::FmtSubscriber;
use wfbench::prelude::*;

#[tokio::main]
async fn main() -> ExitCode {
    FmtSubscriber::builder()
        .with_env_filter("wfbench=info,wfbench_benchmark=info")
        .init();

    PrometheusBuilder::new()
        .with_http_listener("0.0.0.0:9090".parse::<SocketAddr>().unwrap())
        .install()
        .unwrap();

    let config = match RunConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };

    let client = MockOrchestrator::new()
        .with_completion_latency(Duration::from_millis(25), Duration::from_millis(10));

    let mut system_context = BTreeMap::new();
    system_context.insert("orchestrator".to_string(), "mock".to_string());

    let runner = match BenchmarkRunner::new(client, config) {
        Ok(runner) => runner.with_system_context(system_context),
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };

    match runner.run().await {
        Ok(results) => {
            // Pass/fail is data, not exit status.
            for result in &results {
                println!("{}", result.to_summary());
                match result.to_json() {
                    Ok(json) => println!("{json}"),
                    Err(err) => error!("failed to render result JSON: {err}"),
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            // Gating failed; no measurement was possible.
            eprintln!("benchmark failed before measurement: {err}");
            ExitCode::FAILURE
        }
    }
}
