//! Aggregates the lifecycle events of an automation run (an Ansible-style
//! playbook execution) and ships a run summary plus per-task durations to a
//! ClickHouse-compatible store as `JSONEachRow` inserts over HTTP.
//!
//! Hosts drive a [`TelemetryReporter`] through the [`RunLifecycle`] trait.
//! Telemetry failures are logged and never reach the host.

pub mod aggregate;
pub mod context;
pub mod runtime;
pub mod sink;

pub use aggregate::{
    EventType, PureRunAssessment, ReportTimezone, RunAggregator, RunReport, RunStats, RunStatus,
    RunSummary, TaskRecord, WallClock, DEFAULT_PURE_THRESHOLD,
};
pub use context::{RunContext, TaskIdentity};
pub use runtime::config::{TelemetryConfig, TelemetryConfigBuilder, TelemetryConfigParams};
pub use runtime::lifecycle::{LifecycleStage, RunLifecycle};
pub use runtime::reporter::{deliver, TelemetryReporter};
pub use runtime::telemetry::init_tracing;
pub use sink::{InsertTarget, SinkError, SinkMetricsSnapshot, TelemetrySink};
