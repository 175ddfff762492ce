//! Run metadata handed over by the host plus the small derivations (playbook
//! name, inventory label, branch, host and operator identity) that turn raw
//! host values into report fields.

pub mod format;
pub mod host;
pub mod run;

pub use format::{event_type, inventory_descriptor, playbook_name, TaskIdentity};
pub use host::{branch_name, current_operator, system_hostname};
pub use run::RunContext;

/// Sentinel used whenever a host-provided value cannot be derived.
pub const UNKNOWN: &str = "unknown";
