use crate::aggregate::stats::RunStats;
use crate::context::{RunContext, TaskIdentity};

/// Enumerates the host lifecycle events a reporter reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    RunStart,
    TaskStart,
    HostFailed,
    HostUnreachable,
    RunEnd,
}

/// Trait implemented by anything that consumes host lifecycle notifications.
///
/// The host calls these sequentially, once per event, from a single thread.
/// None of the methods can fail: a telemetry consumer must never alter the
/// run it observes.
pub trait RunLifecycle {
    /// Called once when the run begins, before any task starts.
    fn on_run_start(&mut self, context: RunContext);

    /// Called every time the host starts a new task.
    fn on_task_start(&mut self, task: TaskIdentity);

    /// Called each time a task fails on a host.
    fn on_host_failed(&mut self);

    /// Called each time a host cannot be reached.
    fn on_host_unreachable(&mut self);

    /// Called once with the final per-host tallies.
    fn on_run_end(&mut self, stats: &RunStats);
}
