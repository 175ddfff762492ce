use std::fs;
use std::time::Duration;

use crate::support::{
    helpers::{
        closed_endpoint, config_builder, fresh_stats, init_tracing, site_context, wait_for_inserts,
    },
    mock_store::{MockStore, MockStoreServer},
};
use anyhow::Result;
use chrono::{FixedOffset, NaiveDateTime, TimeDelta, Utc};
use run_telemetry::{
    ReportTimezone, RunContext, RunLifecycle, RunStats, RunSummary, TaskIdentity, TaskRecord,
    TelemetryReporter,
};
use tokio::time::sleep;

fn drive_site_run(reporter: &mut TelemetryReporter, context: RunContext, stats: &RunStats) {
    reporter.on_run_start(context);
    reporter.on_task_start(TaskIdentity::from_metadata(None, None));
    reporter.on_task_start(TaskIdentity::from_metadata(Some("Install nginx"), Some("web")));
    reporter.on_host_unreachable();
    reporter.on_task_start(TaskIdentity::from_metadata(Some("Render config"), Some("web")));
    reporter.on_run_end(stats);
}

#[tokio::test]
async fn run_ships_summary_then_task_durations() -> Result<()> {
    init_tracing();
    let store = MockStore::new();
    let server = MockStoreServer::start(store.clone()).await?;
    let config = config_builder(server.url()).tasks_table("tasks").build()?;

    let mut reporter = TelemetryReporter::new(config)?;
    drive_site_run(&mut reporter, site_context(), &fresh_stats());
    reporter.flush().await;

    let inserts = store.inserts();
    assert_eq!(inserts.len(), 2);
    assert_eq!(inserts[0].table()?, "ansible.logs");
    assert_eq!(inserts[1].table()?, "ansible.tasks");

    let summaries: Vec<RunSummary> = inserts[0].rows_as()?;
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.playbook, "site");
    assert_eq!(summary.inventory, "prod");
    assert_eq!(summary.user, "deployer");
    assert_eq!(summary.event_type.as_str(), "play");
    assert_eq!(summary.status.as_str(), "success");
    assert_eq!(summary.hosts, vec!["web-1", "web-2"]);
    assert_eq!(summary.affected_hosts_count, 2);
    assert_eq!(summary.unreachable_hosts_count, 1);
    assert_eq!(summary.limit_expression, "web");
    assert!(summary.pure_play, "3 of 20 tasks unchanged is a fresh run");

    let tasks: Vec<TaskRecord> = inserts[1].rows_as()?;
    let names: Vec<&str> = tasks.iter().map(|task| task.task.as_str()).collect();
    assert_eq!(names, vec!["gather facts", "install nginx", "render config"]);
    assert_eq!(tasks[0].role, "unknown");
    assert!(tasks.iter().all(|task| task.playbook == "site" && task.user == "deployer"));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn tasks_are_not_reported_without_tasks_table() -> Result<()> {
    let store = MockStore::new();
    let server = MockStoreServer::start(store.clone()).await?;
    let config = config_builder(server.url()).build()?;

    let mut reporter = TelemetryReporter::new(config)?;
    drive_site_run(&mut reporter, site_context(), &fresh_stats());
    reporter.flush().await;

    let inserts = store.inserts();
    assert_eq!(inserts.len(), 1);
    assert_eq!(inserts[0].table()?, "ansible.logs");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn check_mode_repeat_run_with_failures() -> Result<()> {
    let store = MockStore::new();
    let server = MockStoreServer::start(store.clone()).await?;
    let config = config_builder(server.url()).build()?;

    let mut reporter = TelemetryReporter::new(config)?;
    let context = RunContext {
        check_mode: true,
        ..site_context()
    };
    reporter.on_run_start(context);
    reporter.on_task_start(TaskIdentity::new("install nginx", "web"));
    reporter.on_host_failed();

    let mut stats = RunStats::new();
    stats.record_ok("web-1", 80).record_changed("web-1", 20);
    reporter.on_run_end(&stats);
    reporter.flush().await;

    let summary = store.inserts()[0]
        .rows_as::<RunSummary>()?
        .pop()
        .expect("one summary row");
    assert_eq!(summary.event_type.as_str(), "check");
    assert_eq!(summary.status.as_str(), "failed");
    assert_eq!(summary.failed_hosts_count, 1);
    assert!(!summary.pure_play, "80% unchanged is a repeat run");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn identity_comes_from_config_and_repository() -> Result<()> {
    let store = MockStore::new();
    let server = MockStoreServer::start(store.clone()).await?;
    let config = config_builder(server.url())
        .operator("release-bot")
        .pure_threshold(90)
        .build()?;

    let repo = tempfile::tempdir()?;
    fs::create_dir(repo.path().join(".git"))?;
    fs::write(repo.path().join(".git").join("HEAD"), "ref: refs/heads/release/1.4\n")?;

    let mut reporter = TelemetryReporter::new(config)?.with_repo_dir(repo.path());
    let context = RunContext {
        operator: Some("host-user".into()),
        branch: None,
        hostname: None,
        ..site_context()
    };
    let mut stats = RunStats::new();
    stats.record_ok("web-1", 80).record_changed("web-1", 20);

    reporter.on_run_start(context);
    reporter.on_run_end(&stats);
    reporter.flush().await;

    let summary = store.inserts()[0]
        .rows_as::<RunSummary>()?
        .pop()
        .expect("one summary row");
    assert_eq!(summary.user, "release-bot");
    assert_eq!(summary.branch, "release/1.4");
    assert!(!summary.hostname.is_empty());
    assert!(summary.pure_play, "80% unchanged stays below a 90% threshold");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn logs_rejection_does_not_block_task_batch() -> Result<()> {
    let store = MockStore::new();
    store.reject_with(500);
    let server = MockStoreServer::start(store.clone()).await?;
    let config = config_builder(server.url()).tasks_table("tasks").build()?;

    let mut reporter = TelemetryReporter::new(config)?;
    drive_site_run(&mut reporter, site_context(), &fresh_stats());
    reporter.flush().await;

    let inserts = wait_for_inserts(&store, 2, Duration::from_secs(2)).await?;
    assert_eq!(inserts[1].table()?, "ansible.tasks");
    assert_eq!(reporter.sink_metrics().rejected, 2);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn unreachable_store_never_disturbs_the_host() -> Result<()> {
    let config = config_builder(&closed_endpoint())
        .tasks_table("tasks")
        .timeout(Duration::from_millis(500))
        .build()?;

    let mut reporter = TelemetryReporter::new(config)?;
    drive_site_run(&mut reporter, site_context(), &fresh_stats());
    reporter.flush().await;

    let metrics = reporter.sink_metrics();
    assert_eq!(metrics.total_submissions, 2);
    assert_eq!(metrics.transport_errors, 2);
    assert_eq!(metrics.delivered, 0);
    Ok(())
}

/// Asserts every timestamp in `summary` reads `ahead` of the current UTC time.
fn assert_rendered_ahead_of_utc(summary: &RunSummary, ahead: TimeDelta) {
    let expected = Utc::now().naive_utc() + ahead;
    for stamp in [&summary.start_time, &summary.end_time] {
        let rendered = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_else(|err| panic!("bad timestamp {stamp:?}: {err}"));
        let drift = (expected - rendered).num_seconds().abs();
        assert!(drift < 120, "{stamp} is not {ahead} ahead of UTC");
    }
    assert_eq!(summary.event_date, summary.end_time[..10]);
}

async fn summary_in_zone(zone: impl Into<ReportTimezone>) -> Result<RunSummary> {
    let store = MockStore::new();
    let server = MockStoreServer::start(store.clone()).await?;
    let config = config_builder(server.url()).timezone(zone).build()?;

    let mut reporter = TelemetryReporter::new(config)?;
    drive_site_run(&mut reporter, site_context(), &fresh_stats());
    reporter.flush().await;

    let summary = store.inserts()[0]
        .rows_as::<RunSummary>()?
        .pop()
        .expect("one summary row");
    server.shutdown().await;
    Ok(summary)
}

#[tokio::test]
async fn configured_offset_shapes_summary_timestamps() -> Result<()> {
    let offset = FixedOffset::east_opt(14 * 3600).expect("valid offset");
    let summary = summary_in_zone(offset).await?;
    assert_rendered_ahead_of_utc(&summary, TimeDelta::hours(14));
    Ok(())
}

#[tokio::test]
async fn configured_zone_name_shapes_summary_timestamps() -> Result<()> {
    let summary = summary_in_zone(chrono_tz::Asia::Kathmandu).await?;
    assert_rendered_ahead_of_utc(&summary, TimeDelta::hours(5) + TimeDelta::minutes(45));
    Ok(())
}

#[tokio::test]
async fn delivery_runs_without_explicit_flush() -> Result<()> {
    let store = MockStore::new();
    let server = MockStoreServer::start(store.clone()).await?;
    let config = config_builder(server.url()).build()?;

    let mut reporter = TelemetryReporter::new(config)?;
    drive_site_run(&mut reporter, site_context(), &fresh_stats());
    drop(reporter);

    sleep(Duration::from_millis(20)).await;
    let inserts = wait_for_inserts(&store, 1, Duration::from_secs(2)).await?;
    assert_eq!(inserts[0].table()?, "ansible.logs");

    server.shutdown().await;
    Ok(())
}
