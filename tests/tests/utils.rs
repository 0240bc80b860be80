use std::time::Duration;
use wfbench::prelude::*;

pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("wfbench=info")
        .try_init();
}

pub fn quick_config(kind: WorkflowKind) -> RunConfig {
    let mut config = RunConfig::new(kind);
    config.target_rate = 50.0;
    config.test_duration = Duration::from_secs(2);
    config.ramp_up = Duration::from_millis(500);
    config.worker_count = 2;
    config.drain_timeout = Some(Duration::from_secs(10));
    config
}
