use std::net::TcpListener;
use std::time::Duration;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use run_telemetry::{RunContext, RunStats, TelemetryConfig, TelemetryConfigBuilder};
use tokio::time::{sleep, Instant};

use crate::support::mock_store::{MockStore, RecordedInsert};

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(run_telemetry::init_tracing);

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

pub fn config_builder(endpoint: &str) -> TelemetryConfigBuilder {
    TelemetryConfig::builder()
        .endpoint(endpoint)
        .database("ansible")
        .logs_table("logs")
        .timeout(Duration::from_secs(2))
}

/// Endpoint on a port nothing listens on.
pub fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

pub fn site_context() -> RunContext {
    RunContext {
        playbook: Some("playbooks/site.yml".into()),
        check_mode: false,
        tags: vec!["nginx".into()],
        skip_tags: vec![],
        limit: Some("web".into()),
        inventory: vec!["inventories/prod/hosts".into()],
        extra_vars: vec!["release=42".into()],
        connection: Some("ssh".into()),
        forks: 5,
        operator: Some("deployer".into()),
        hostname: Some("bastion-1".into()),
        branch: Some("main".into()),
    }
}

/// Two web hosts where most tasks changed something.
pub fn fresh_stats() -> RunStats {
    let mut stats = RunStats::new();
    stats
        .record_ok("web-2", 2)
        .record_changed("web-2", 8)
        .record_ok("web-1", 1)
        .record_changed("web-1", 9)
        .record_skipped("web-1", 4);
    stats
}

pub async fn wait_for_inserts(
    store: &MockStore,
    expected: usize,
    timeout: Duration,
) -> Result<Vec<RecordedInsert>> {
    let deadline = Instant::now() + timeout;
    loop {
        let inserts = store.inserts();
        if inserts.len() >= expected {
            return Ok(inserts);
        }
        if Instant::now() >= deadline {
            bail!(
                "timed out waiting for {expected} inserts (got {})",
                inserts.len()
            );
        }
        sleep(Duration::from_millis(10)).await;
    }
}
