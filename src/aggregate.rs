//! Run aggregation: lifecycle counters, back-to-back task timing, the pure-run
//! heuristic and the rows produced at run end.

pub mod clock;
pub mod purity;
pub mod records;
pub mod run;
pub mod stats;

pub use clock::{ReportTimezone, WallClock};
pub use purity::{PureRunAssessment, DEFAULT_PURE_THRESHOLD};
pub use records::{EventType, RunReport, RunStatus, RunSummary, TaskRecord};
pub use run::RunAggregator;
pub use stats::RunStats;
