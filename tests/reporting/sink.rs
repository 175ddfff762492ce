use std::time::Duration;

use crate::support::{
    helpers::{closed_endpoint, init_tracing},
    mock_store::{MockStore, MockStoreServer},
};
use anyhow::Result;
use run_telemetry::{
    EventType, InsertTarget, RunStatus, RunSummary, SinkError, TaskRecord, TelemetrySink,
};

fn summary() -> RunSummary {
    RunSummary {
        event_date: "2024-03-05".into(),
        start_time: "2024-03-05 10:00:00".into(),
        end_time: "2024-03-05 10:00:42".into(),
        duration: 42,
        user: "deployer".into(),
        hostname: "bastion-1".into(),
        inventory: "prod".into(),
        playbook: "site".into(),
        event_type: EventType::Play,
        status: RunStatus::Success,
        branch: "main".into(),
        tags: vec!["nginx".into()],
        skipped_tags: vec!["slow".into()],
        extra_vars: vec![],
        limit_expression: "all".into(),
        hosts: vec!["web-1".into(), "web-2".into()],
        affected_hosts_count: 2,
        unreachable_hosts_count: 0,
        failed_hosts_count: 0,
        connection_mode: "ssh".into(),
        forks_count: 5,
        pure_play: true,
    }
}

fn task(name: &str, duration: u64) -> TaskRecord {
    TaskRecord {
        event_date: "2024-03-05".into(),
        playbook: "site".into(),
        user: "deployer".into(),
        role: "web".into(),
        task: name.into(),
        duration,
    }
}

#[tokio::test]
async fn submit_posts_one_insert_with_credentials() -> Result<()> {
    init_tracing();
    let store = MockStore::new();
    let server = MockStoreServer::start(store.clone()).await?;
    let target = InsertTarget::new(server.url(), "ansible", "tasks")
        .with_credentials("writer", Some("p@ss word".into()));

    let sink = TelemetrySink::new()?;
    sink.submit(&target, &[task("install", 1_250), task("restart", 40)])
        .await;

    let inserts = store.inserts();
    assert_eq!(inserts.len(), 1, "exactly one request per batch");
    let insert = &inserts[0];
    assert_eq!(insert.method, "POST");
    assert_eq!(insert.path, "/");
    assert_eq!(insert.query_param("user").as_deref(), Some("writer"));
    assert_eq!(insert.query_param("password").as_deref(), Some("p@ss word"));
    assert_eq!(insert.content_type.as_deref(), Some("application/json"));
    assert_eq!(insert.table()?, "ansible.tasks");
    assert!(insert
        .statement
        .starts_with("INSERT INTO ansible.tasks FORMAT JSONEachRow {"));

    let rows: Vec<TaskRecord> = insert.rows_as()?;
    assert_eq!(rows, vec![task("install", 1_250), task("restart", 40)]);
    assert_eq!(sink.metrics().delivered, 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn password_is_omitted_when_not_configured() -> Result<()> {
    let store = MockStore::new();
    let server = MockStoreServer::start(store.clone()).await?;
    let target = InsertTarget::new(server.url(), "ansible", "logs");

    TelemetrySink::new()?.submit(&target, &[summary()]).await;

    let insert = &store.inserts()[0];
    assert_eq!(insert.query_param("user").as_deref(), Some("default"));
    assert_eq!(insert.query_param("password"), None);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn summary_row_reaches_store_unchanged() -> Result<()> {
    let store = MockStore::new();
    let server = MockStoreServer::start(store.clone()).await?;
    let target = InsertTarget::new(server.url(), "ansible", "logs");

    TelemetrySink::new()?.submit(&target, &[summary()]).await;

    let rows: Vec<RunSummary> = store.inserts()[0].rows_as()?;
    assert_eq!(rows, vec![summary()]);

    let raw = store.inserts()[0].rows()?;
    assert_eq!(raw[0]["duration"], 42);
    assert_eq!(raw[0]["event_type"], "play");
    assert_eq!(raw[0]["hosts"][1], "web-2");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn rejected_insert_is_swallowed_and_counted() -> Result<()> {
    init_tracing();
    let store = MockStore::new();
    store.reject_with(404);
    let server = MockStoreServer::start(store.clone()).await?;
    let target = InsertTarget::new(server.url(), "ansible", "missing");

    let sink = TelemetrySink::new()?;
    sink.submit(&target, &[summary()]).await;
    assert_eq!(sink.metrics().rejected, 1);

    let err = sink.try_submit(&target, &[summary()]).await.unwrap_err();
    match err {
        SinkError::Rejected { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("UNKNOWN_TABLE"), "body should be kept: {body}");
        }
        other => panic!("expected rejection, got {other}"),
    }
    assert_eq!(store.inserts().len(), 2, "rejections are never retried");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn slow_store_hits_the_request_timeout() -> Result<()> {
    let store = MockStore::new();
    store.delay_responses(Duration::from_millis(1_500));
    let server = MockStoreServer::start(store.clone()).await?;
    let target =
        InsertTarget::new(server.url(), "ansible", "logs").with_timeout(Duration::from_millis(100));

    let sink = TelemetrySink::new()?;
    let err = sink.try_submit(&target, &[summary()]).await.unwrap_err();
    assert!(matches!(err, SinkError::Timeout { .. }), "got {err}");
    assert_eq!(sink.metrics().timeouts, 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn unreachable_store_does_not_raise() -> Result<()> {
    init_tracing();
    let target = InsertTarget::new(closed_endpoint(), "ansible", "logs");
    let sink = TelemetrySink::new()?;

    sink.submit(&target, &[summary()]).await;

    let metrics = sink.metrics();
    assert_eq!(metrics.total_submissions, 1);
    assert_eq!(metrics.transport_errors, 1);
    Ok(())
}
