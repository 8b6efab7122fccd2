//! Error taxonomy for the ranking engine.
//!
//! Every variant is fatal for the call that produced it: nothing here is
//! retried or recovered inside the crate.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SmoopError {
    /// A ranking pass returned a different number of points than it received.
    #[error("returned points of {strategy} not equal to input points [is/was] = {actual}/{expected}")]
    InvariantViolation {
        strategy: String,
        actual: usize,
        expected: usize,
    },
    #[error("sum of weights must be one, but is {sum}")]
    WeightSum { sum: f64 },
    #[error("at least {required} objectives are required, got {actual}")]
    TooFewObjectives { required: usize, actual: usize },
    #[error("illegal topN value passed, must be greater than 0: {top_n}")]
    InvalidTopN { top_n: usize },
    #[error("illegal state: no objectives found for priority {priority}")]
    NoObjectivesForPriority { priority: i64 },
    #[error("ranking score cannot be larger than the number of ranked entries [is/max] = {score}/{max}")]
    RankOverflow { score: usize, max: usize },
    #[error("metric selection must not be empty")]
    EmptySelection,
    #[error("candidate list must not be empty")]
    EmptyCandidates,
    #[error("dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("objective must be 0 (minimize) or 1 (maximize), got {value}")]
    InvalidObjective { value: u8 },
}

pub type Result<T> = std::result::Result<T, SmoopError>;
