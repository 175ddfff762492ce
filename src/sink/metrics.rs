//! Counters tracking insert outcomes so callers can inspect delivery without
//! the sink ever reporting failures through its return value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct SinkMetrics {
    total_submissions: AtomicU64,
    delivered: AtomicU64,
    rejected: AtomicU64,
    transport_errors: AtomicU64,
    timeouts: AtomicU64,
    total_latency_ns: AtomicU64,
}

impl SinkMetrics {
    pub(crate) fn record_delivered(&self, latency: Duration) {
        self.total_submissions.fetch_add(1, Ordering::Relaxed);
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
    }

    pub(crate) fn record_rejected(&self, latency: Duration) {
        self.total_submissions.fetch_add(1, Ordering::Relaxed);
        self.rejected.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
    }

    pub(crate) fn record_transport_error(&self, latency: Duration) {
        self.total_submissions.fetch_add(1, Ordering::Relaxed);
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
    }

    pub(crate) fn record_timeout(&self, latency: Duration) {
        self.record_transport_error(latency);
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SinkMetricsSnapshot {
        let total_submissions = self.total_submissions.load(Ordering::Relaxed);
        let total_latency_ns = self.total_latency_ns.load(Ordering::Relaxed);

        let average_latency_ms = if total_submissions == 0 {
            0.0
        } else {
            (total_latency_ns as f64 / total_submissions as f64) / 1_000_000.0
        };

        SinkMetricsSnapshot {
            total_submissions,
            delivered: self.delivered.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            average_latency_ms,
        }
    }

    fn record_latency(&self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.total_latency_ns.fetch_add(nanos, Ordering::Relaxed);
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SinkMetricsSnapshot {
    /// Inserts that reached the network layer.
    pub total_submissions: u64,
    pub delivered: u64,
    /// Inserts the store answered with a non-success status.
    pub rejected: u64,
    /// Connection failures and timeouts.
    pub transport_errors: u64,
    pub timeouts: u64,
    pub average_latency_ms: f64,
}
