use crate::core_modules::area::Dimensions;
use thiserror::Error;

/// Failures the engine can surface. Configuration errors abort at
/// initialization; invariant violations abort the run with the offending
/// key attached. Stale-data conditions are recovered locally and never
/// appear here, and cancellation always returns `Ok` with partial results.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptimizerError {
    #[error("sizing policies produced no candidate window sizes")]
    EmptySizingSequence,

    #[error("sizing policies produced a degenerate window size {0}")]
    DegenerateSizing(Dimensions),

    #[error("freshness span must be at least 1")]
    ZeroFreshnessSpan,

    #[error("correlation index is empty while {unprocessed} opaque pixels remain")]
    EmptyIndex { unprocessed: u64 },

    #[error("winner {hash:#018x} vanished from the correlation index")]
    WinnerMissing { hash: u64 },

    #[error("optimizer worker task failed: {0}")]
    Worker(String),
}
