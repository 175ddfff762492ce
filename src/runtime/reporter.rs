use crate::aggregate::clock::WallClock;
use crate::aggregate::records::RunReport;
use crate::aggregate::run::RunAggregator;
use crate::aggregate::stats::RunStats;
use crate::context::{self, RunContext, TaskIdentity};
use crate::runtime::config::TelemetryConfig;
use crate::runtime::lifecycle::RunLifecycle;
use crate::sink::client::TelemetrySink;
use crate::sink::metrics::SinkMetricsSnapshot;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Adapter between a host's lifecycle callbacks and the telemetry store.
///
/// Forwards every event to a [`RunAggregator`] and, once the run ends, ships
/// the report on a background task. Delivery is best effort: call
/// [`TelemetryReporter::flush`] before the process exits to wait for it.
pub struct TelemetryReporter {
    config: Arc<TelemetryConfig>,
    sink: TelemetrySink,
    aggregator: RunAggregator,
    repo_dir: PathBuf,
    runtime: Handle,
    delivery: Option<JoinHandle<()>>,
}

impl TelemetryReporter {
    /// Creates a reporter bound to the current tokio runtime.
    pub fn new(config: TelemetryConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .context("telemetry reporter must be created inside a tokio runtime")?;
        Self::with_runtime(config, TelemetrySink::new()?, runtime)
    }

    /// Creates a reporter that spawns delivery onto `runtime` using `sink`.
    pub fn with_runtime(config: TelemetryConfig, sink: TelemetrySink, runtime: Handle) -> Result<Self> {
        config.validate()?;
        let clock = WallClock::with_zone(config.timezone());
        let aggregator = RunAggregator::with_clock(config.pure_threshold(), clock);
        Ok(Self {
            config: Arc::new(config),
            sink,
            aggregator,
            repo_dir: PathBuf::from("."),
            runtime,
            delivery: None,
        })
    }

    /// Directory whose git checkout names the reported branch; defaults to the
    /// working directory.
    pub fn with_repo_dir(mut self, repo_dir: impl Into<PathBuf>) -> Self {
        self.repo_dir = repo_dir.into();
        self
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &RunAggregator {
        &self.aggregator
    }

    pub fn sink_metrics(&self) -> SinkMetricsSnapshot {
        self.sink.metrics()
    }

    pub fn is_delivery_pending(&self) -> bool {
        self.delivery
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Waits for the background delivery started at run end, if any.
    pub async fn flush(&mut self) {
        let Some(handle) = self.delivery.take() else {
            return;
        };
        if let Err(err) = handle.await {
            tracing::warn!(
                target: "run_telemetry::reporter",
                error = %err,
                "telemetry delivery task did not complete"
            );
        }
    }

    fn resolve_identity(&self, run: &mut RunContext) {
        if let Some(operator) = self.config.operator() {
            run.operator = Some(operator.to_owned());
        } else if run.operator.is_none() {
            run.operator = Some(context::current_operator());
        }
        if run.hostname.is_none() {
            run.hostname = Some(context::system_hostname());
        }
        if run.branch.is_none() {
            run.branch = Some(context::branch_name(&self.repo_dir));
        }
    }
}

impl RunLifecycle for TelemetryReporter {
    fn on_run_start(&mut self, mut context: RunContext) {
        self.resolve_identity(&mut context);
        self.aggregator.on_run_start(context);
    }

    fn on_task_start(&mut self, task: TaskIdentity) {
        self.aggregator.on_task_start(task);
    }

    fn on_host_failed(&mut self) {
        self.aggregator.on_host_failed();
    }

    fn on_host_unreachable(&mut self) {
        self.aggregator.on_host_unreachable();
    }

    fn on_run_end(&mut self, stats: &RunStats) {
        self.aggregator.on_run_end(stats);
        let Some(report) = self.aggregator.take_report() else {
            return;
        };

        tracing::info!(
            target: "run_telemetry::reporter",
            playbook = %report.summary.playbook,
            status = report.summary.status.as_str(),
            tasks = report.tasks.len(),
            pure = report.summary.pure_play,
            "run finished; shipping telemetry"
        );

        let config = Arc::clone(&self.config);
        let sink = self.sink.clone();
        self.delivery = Some(
            self.runtime
                .spawn(async move { deliver(&config, &sink, &report).await }),
        );
    }
}

/// Ships a finished run: the summary row to the logs table, then the task rows
/// to the tasks table when one is configured.
pub async fn deliver(config: &TelemetryConfig, sink: &TelemetrySink, report: &RunReport) {
    sink.submit(&config.logs_target(), std::slice::from_ref(&report.summary))
        .await;

    match config.tasks_target() {
        Some(target) => sink.submit(&target, &report.tasks).await,
        None => {
            tracing::debug!(
                target: "run_telemetry::reporter",
                "no tasks table configured; skipping task durations"
            );
        }
    }
}
