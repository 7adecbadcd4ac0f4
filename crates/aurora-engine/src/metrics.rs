//! Per-step performance metrics for the simulation engine.
//!
//! [`StepMetrics`] captures timing and particle traffic for a single
//! step, for telemetry and load-balance diagnostics.

/// Timing and particle counts collected during a single step.
///
/// All durations are in microseconds. Phases skipped on a step (sort
/// and migration off the sort interval) report zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step.
    pub total_us: u64,
    /// Time spent computing particle motions.
    pub push_us: u64,
    /// Time spent depositing current (and charge density).
    pub deposit_us: u64,
    /// Time spent committing motions to the particle array.
    pub commit_us: u64,
    /// Time spent in the cell sort.
    pub sort_us: u64,
    /// Time spent migrating particles, host/device copies included.
    pub migrate_us: u64,
    /// Particles shipped to other ranks.
    pub sent: usize,
    /// Particles received from other ranks.
    pub received: usize,
    /// Particles erased at physical edges.
    pub edge_removed: usize,
    /// Particles dropped because their move left the local grid.
    pub lost: usize,
    /// Particles skipped by deposition.
    pub ignored: usize,
    /// Occupied slots after the step.
    pub number: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.push_us, 0);
        assert_eq!(m.sent, 0);
        assert_eq!(m.number, 0);
    }
}
