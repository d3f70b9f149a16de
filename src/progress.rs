// THEORY:
// Progress is published through explicit shared handles rather than ambient
// global counters. The optimizer owns two `Arc<ProgressReport>`s: an overall
// stream (opaque pixels processed vs. total) and a current-operation stream
// (phase plus units done vs. units total). Observers poll them without
// blocking the engine; counters only move forward within a phase.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// The operation currently occupying the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerPhase {
    /// No run in progress.
    Idle,
    /// Initial whole-sheet opaque pixel count.
    CountingPixels,
    /// Full index rebuild scan.
    FetchingAreas,
    /// Partial revalidation of the top-ranked entries.
    UpdatingVolatileScores,
    /// Erasing the winner's correlations from the sheet.
    ApplyingWinner,
    /// Whole-run pixel removal (the overall stream stays in this phase).
    RemovingAreas,
    /// Run finished, cancelled or complete.
    Complete,
}

impl OptimizerPhase {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::CountingPixels => "Counting opaque pixels",
            Self::FetchingAreas => "Fetching possible areas",
            Self::UpdatingVolatileScores => "Updating volatile scores",
            Self::ApplyingWinner => "Applying winner area",
            Self::RemovingAreas => "Removing areas from picture",
            Self::Complete => "Complete",
        }
    }
}

/// A shared progress stream: one phase label plus monotonically
/// non-decreasing done/total counters for that phase.
#[derive(Debug)]
pub struct ProgressReport {
    phase: Mutex<OptimizerPhase>,
    done: AtomicU64,
    total: AtomicU64,
}

impl ProgressReport {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(OptimizerPhase::Idle),
            done: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Enters a new phase, resetting the counters for it.
    pub fn begin(&self, phase: OptimizerPhase, total: u64) {
        *self.phase.lock().unwrap() = phase;
        self.total.store(total, Ordering::Release);
        self.done.store(0, Ordering::Release);
    }

    pub fn advance(&self, units: u64) {
        self.done.fetch_add(units, Ordering::AcqRel);
    }

    pub fn phase(&self) -> OptimizerPhase {
        *self.phase.lock().unwrap()
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Acquire)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            1.0
        } else {
            self.done() as f64 / total as f64
        }
    }
}

impl Default for ProgressReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_resets_counters() {
        let report = ProgressReport::new();
        report.begin(OptimizerPhase::FetchingAreas, 10);
        report.advance(4);
        assert_eq!(report.done(), 4);
        assert_eq!(report.fraction(), 0.4);

        report.begin(OptimizerPhase::ApplyingWinner, 2);
        assert_eq!(report.phase(), OptimizerPhase::ApplyingWinner);
        assert_eq!(report.done(), 0);
        assert_eq!(report.total(), 2);
    }

    #[test]
    fn empty_phase_reads_as_complete() {
        let report = ProgressReport::new();
        report.begin(OptimizerPhase::Complete, 0);
        assert_eq!(report.fraction(), 1.0);
    }

    #[test]
    fn phase_descriptions_are_stable() {
        assert_eq!(
            OptimizerPhase::FetchingAreas.description(),
            "Fetching possible areas"
        );
        assert_eq!(
            OptimizerPhase::RemovingAreas.description(),
            "Removing areas from picture"
        );
    }
}
