use crate::aggregate::stats::RunStats;

/// Share of unchanged tasks (in percent) at or above which a run counts as a
/// repeat run against already converged hosts.
pub const DEFAULT_PURE_THRESHOLD: u8 = 75;

/// Result of the pure-run heuristic together with the totals it was based on.
///
/// A run is "pure" when it looks like first-time provisioning: most tasks
/// changed something. Runs where at least `threshold` percent of the ok/changed
/// tasks reported no change are classified as repeat runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PureRunAssessment {
    pub unchanged: u64,
    pub changed: u64,
    pub skipped: u64,
    pub total: u64,
    pub percent_unchanged: f64,
    pub threshold: u8,
    pub is_pure: bool,
}

impl PureRunAssessment {
    pub fn from_stats(stats: &RunStats, threshold: u8) -> Self {
        Self::assess(
            stats.ok_total(),
            stats.changed_total(),
            stats.skipped_total(),
            threshold,
        )
    }

    pub fn assess(unchanged: u64, changed: u64, skipped: u64, threshold: u8) -> Self {
        let total = unchanged.saturating_add(changed);
        let percent_unchanged = if total == 0 {
            0.0
        } else {
            (unchanged as f64 / total as f64) * 100.0
        };
        // An empty run has nothing to compare against and stays pure.
        let is_pure = !(total > 0 && percent_unchanged >= f64::from(threshold));

        Self {
            unchanged,
            changed,
            skipped,
            total,
            percent_unchanged,
            threshold,
            is_pure,
        }
    }
}
