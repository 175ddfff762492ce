use std::collections::{BTreeMap, BTreeSet};

/// End-of-run per-host tallies as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    ok: BTreeMap<String, u64>,
    changed: BTreeMap<String, u64>,
    skipped: BTreeMap<String, u64>,
    processed: BTreeSet<String>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a host as processed even if it has no tallies.
    pub fn mark_processed(&mut self, host: impl Into<String>) -> &mut Self {
        self.processed.insert(host.into());
        self
    }

    pub fn record_ok(&mut self, host: impl Into<String>, count: u64) -> &mut Self {
        Self::record(&mut self.ok, &mut self.processed, host.into(), count);
        self
    }

    pub fn record_changed(&mut self, host: impl Into<String>, count: u64) -> &mut Self {
        Self::record(&mut self.changed, &mut self.processed, host.into(), count);
        self
    }

    pub fn record_skipped(&mut self, host: impl Into<String>, count: u64) -> &mut Self {
        Self::record(&mut self.skipped, &mut self.processed, host.into(), count);
        self
    }

    pub fn ok_total(&self) -> u64 {
        Self::total(&self.ok)
    }

    pub fn changed_total(&self) -> u64 {
        Self::total(&self.changed)
    }

    pub fn skipped_total(&self) -> u64 {
        Self::total(&self.skipped)
    }

    /// Sorted, deduplicated names of every host present in the snapshot.
    pub fn hosts(&self) -> Vec<String> {
        self.processed.iter().cloned().collect()
    }

    fn record(
        tallies: &mut BTreeMap<String, u64>,
        processed: &mut BTreeSet<String>,
        host: String,
        count: u64,
    ) {
        let entry = tallies.entry(host.clone()).or_insert(0);
        *entry = entry.saturating_add(count);
        processed.insert(host);
    }

    fn total(tallies: &BTreeMap<String, u64>) -> u64 {
        tallies
            .values()
            .fold(0u64, |sum, count| sum.saturating_add(*count))
    }
}
