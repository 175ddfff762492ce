//! Runtime glue that wires configuration, the lifecycle trait, tracing and the
//! reporter that connects a host to the telemetry store.

pub mod config;
pub mod lifecycle;
pub mod reporter;
pub mod telemetry;
