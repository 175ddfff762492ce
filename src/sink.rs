//! Telemetry shipping: insert targets, row encoding, delivery metrics and the
//! HTTP client that posts `JSONEachRow` inserts.

pub mod client;
pub mod metrics;
pub mod rows;
pub mod target;

pub use client::{SinkError, TelemetrySink};
pub use metrics::SinkMetricsSnapshot;
pub use rows::encode_rows;
pub use target::{InsertTarget, DEFAULT_TIMEOUT, DEFAULT_USER};
