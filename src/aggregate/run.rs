use crate::aggregate::clock::WallClock;
use crate::aggregate::purity::{PureRunAssessment, DEFAULT_PURE_THRESHOLD};
use crate::aggregate::records::{
    RunReport, RunStatus, RunSummary, TaskRecord, DATETIME_FORMAT, DATE_FORMAT,
};
use crate::aggregate::stats::RunStats;
use crate::context::{self, RunContext, TaskIdentity, UNKNOWN};
use crate::runtime::lifecycle::{LifecycleStage, RunLifecycle};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use std::time::Instant;

#[derive(Debug, Clone)]
enum TaskTiming {
    Running { role: String, started: Instant },
    Finished { role: String, duration_ms: u64 },
}

/// Accumulates the state of one automation run.
///
/// Tasks are timed back to back: a task runs from its own start until the
/// next task starts or the run ends. Task names are the record key, so a name
/// reported twice keeps only its latest timing.
#[derive(Debug)]
pub struct RunAggregator {
    clock: WallClock,
    pure_threshold: u8,
    context: RunContext,
    started_at: DateTime<FixedOffset>,
    tasks: IndexMap<String, TaskTiming>,
    current: Option<String>,
    failed_hosts: u64,
    unreachable_hosts: u64,
    finished: bool,
    report: Option<RunReport>,
}

impl Default for RunAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_PURE_THRESHOLD)
    }
}

impl RunAggregator {
    /// Aggregator stamping reports in local time. `pure_threshold` is the
    /// unchanged-task percentage at or above which a run counts as a repeat.
    pub fn new(pure_threshold: u8) -> Self {
        Self::with_clock(pure_threshold, WallClock::local())
    }

    /// Same as [`RunAggregator::new`] with report timestamps taken from `clock`.
    pub fn with_clock(pure_threshold: u8, clock: WallClock) -> Self {
        Self {
            clock,
            pure_threshold,
            context: RunContext::default(),
            started_at: clock.now(),
            tasks: IndexMap::new(),
            current: None,
            failed_hosts: 0,
            unreachable_hosts: 0,
            finished: false,
            report: None,
        }
    }

    pub fn pure_threshold(&self) -> u8 {
        self.pure_threshold
    }

    /// Host failures reported so far.
    pub fn failed_hosts(&self) -> u64 {
        self.failed_hosts
    }

    /// Unreachable-host events reported so far.
    pub fn unreachable_hosts(&self) -> u64 {
        self.unreachable_hosts
    }

    /// Name of the task currently being timed.
    pub fn current_task(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Number of distinct task names seen so far.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the run has ended; later lifecycle events are ignored.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Hands out the report produced at run end. Returns `None` before the
    /// run ended and on every call after the first.
    pub fn take_report(&mut self) -> Option<RunReport> {
        self.report.take()
    }

    /// [`RunLifecycle::on_run_start`] with an explicit start timestamp, for
    /// deterministic timing.
    pub fn on_run_start_at(&mut self, context: RunContext, at: DateTime<FixedOffset>) {
        if self.ignore_after_end(LifecycleStage::RunStart) {
            return;
        }
        tracing::debug!(
            target: "run_telemetry::aggregate",
            playbook = context.playbook.as_deref().unwrap_or(UNKNOWN),
            check_mode = context.check_mode,
            "run started"
        );
        self.context = context;
        self.started_at = at;
    }

    /// [`RunLifecycle::on_task_start`] with an explicit instant. The current
    /// task is finalized with `at` as its end.
    pub fn on_task_start_at(&mut self, task: TaskIdentity, at: Instant) {
        if self.ignore_after_end(LifecycleStage::TaskStart) {
            return;
        }
        self.finalize_current(at);

        let (name, role) = task.into_parts();
        let previous = self.tasks.insert(name.clone(), TaskTiming::Running { role, started: at });
        if previous.is_some() {
            tracing::debug!(
                target: "run_telemetry::aggregate",
                task = %name,
                "task name reported again; keeping the latest timing"
            );
        }
        self.current = Some(name);
    }

    /// [`RunLifecycle::on_run_end`] with explicit time sources: `ended_at`
    /// stamps the summary and `now` closes the last task.
    pub fn on_run_end_at(
        &mut self,
        stats: &RunStats,
        ended_at: DateTime<FixedOffset>,
        now: Instant,
    ) {
        if self.ignore_after_end(LifecycleStage::RunEnd) {
            return;
        }
        self.finalize_current(now);
        self.finished = true;

        let purity = PureRunAssessment::from_stats(stats, self.pure_threshold);
        tracing::debug!(
            target: "run_telemetry::aggregate",
            unchanged = purity.unchanged,
            changed = purity.changed,
            skipped = purity.skipped,
            percent_unchanged = format!("{:.2}", purity.percent_unchanged),
            pure = purity.is_pure,
            "pure run assessment"
        );

        let summary = self.build_summary(stats, ended_at, purity.is_pure);
        let tasks = self.build_task_records(&summary);
        self.report = Some(RunReport {
            summary,
            tasks,
            purity,
        });
    }

    fn finalize_current(&mut self, now: Instant) {
        let Some(name) = self.current.take() else {
            return;
        };
        if let Some(TaskTiming::Running { role, started }) = self.tasks.get(&name) {
            let elapsed = now.saturating_duration_since(*started).as_millis();
            let finished = TaskTiming::Finished {
                role: role.clone(),
                duration_ms: u64::try_from(elapsed).unwrap_or(u64::MAX),
            };
            self.tasks.insert(name, finished);
        }
    }

    fn build_summary(
        &self,
        stats: &RunStats,
        ended_at: DateTime<FixedOffset>,
        pure_play: bool,
    ) -> RunSummary {
        let meta = &self.context;
        let hosts = stats.hosts();
        let duration = (ended_at - self.started_at).num_seconds().max(0) as u64;

        RunSummary {
            event_date: ended_at.format(DATE_FORMAT).to_string(),
            start_time: self.started_at.format(DATETIME_FORMAT).to_string(),
            end_time: ended_at.format(DATETIME_FORMAT).to_string(),
            duration,
            user: or_unknown(meta.operator.as_deref()),
            hostname: or_unknown(meta.hostname.as_deref()),
            inventory: context::inventory_descriptor(meta.inventory.as_slice()),
            playbook: context::playbook_name(meta.playbook.as_deref()),
            event_type: context::event_type(meta.check_mode),
            status: RunStatus::from_failed_hosts(self.failed_hosts),
            branch: or_unknown(meta.branch.as_deref()),
            tags: meta.tags.clone(),
            skipped_tags: meta.skip_tags.clone(),
            extra_vars: meta.extra_vars.clone(),
            limit_expression: meta.limit_expression().to_owned(),
            affected_hosts_count: hosts.len() as u64,
            hosts,
            unreachable_hosts_count: self.unreachable_hosts,
            failed_hosts_count: self.failed_hosts,
            connection_mode: or_unknown(meta.connection.as_deref()),
            forks_count: meta.forks,
            pure_play,
        }
    }

    fn build_task_records(&self, summary: &RunSummary) -> Vec<TaskRecord> {
        let event_date = self.started_at.format(DATE_FORMAT).to_string();
        self.tasks
            .iter()
            .filter_map(|(name, timing)| match timing {
                TaskTiming::Finished { role, duration_ms } => Some(TaskRecord {
                    event_date: event_date.clone(),
                    playbook: summary.playbook.clone(),
                    user: summary.user.clone(),
                    role: role.clone(),
                    task: name.clone(),
                    duration: *duration_ms,
                }),
                TaskTiming::Running { .. } => None,
            })
            .collect()
    }

    fn ignore_after_end(&self, stage: LifecycleStage) -> bool {
        if self.finished {
            tracing::debug!(
                target: "run_telemetry::aggregate",
                stage = ?stage,
                "lifecycle event after run end ignored"
            );
        }
        self.finished
    }
}

impl RunLifecycle for RunAggregator {
    fn on_run_start(&mut self, context: RunContext) {
        let now = self.clock.now();
        self.on_run_start_at(context, now);
    }

    fn on_task_start(&mut self, task: TaskIdentity) {
        self.on_task_start_at(task, Instant::now());
    }

    fn on_host_failed(&mut self) {
        if self.ignore_after_end(LifecycleStage::HostFailed) {
            return;
        }
        self.failed_hosts = self.failed_hosts.saturating_add(1);
    }

    fn on_host_unreachable(&mut self) {
        if self.ignore_after_end(LifecycleStage::HostUnreachable) {
            return;
        }
        self.unreachable_hosts = self.unreachable_hosts.saturating_add(1);
    }

    fn on_run_end(&mut self, stats: &RunStats) {
        let ended_at = self.clock.now();
        self.on_run_end_at(stats, ended_at, Instant::now());
    }
}

fn or_unknown(value: Option<&str>) -> String {
    match value {
        Some(value) if !value.trim().is_empty() => value.to_owned(),
        _ => UNKNOWN.to_owned(),
    }
}
