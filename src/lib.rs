#![forbid(unsafe_code)]

//! # smoop
//!
//! Multi-objective ranking of scored software components.
//!
//! Given candidates carrying named numeric metrics and a selection of
//! objectives (minimize or maximize, optionally weighted and prioritized),
//! smoop orders the candidates, partitions them into groups it cannot tell
//! apart, and measures how good the resulting ranking is. Strategies range
//! from plain Pareto fronts through priority-recursive hybrid sorting to
//! weighted scalarization and reference-point distance.
//!
//! ```
//! use smoop::{Candidate, MetricSelection, Ranker, RankingStrategy};
//!
//! let selection = vec![
//!     MetricSelection::maximize("coverage"),
//!     MetricSelection::minimize("complexity"),
//! ];
//! let candidates = vec![
//!     Candidate::new("a").with_metric("coverage", 0.9).with_metric("complexity", 4.0),
//!     Candidate::new("b").with_metric("coverage", 0.5).with_metric("complexity", 9.0),
//! ];
//!
//! let ranking = Ranker::default()
//!     .rank(RankingStrategy::Hds, &selection, candidates)
//!     .unwrap();
//! assert_eq!(ranking.ids(), vec!["a", "b"]);
//! ```

pub mod collector;
pub mod dominance;
pub mod error;
pub mod evaluation;
pub mod priority;
pub mod problem;
pub mod rankers;
pub mod scalarize;
pub mod scoring;
pub mod strategy;

pub use collector::{NoopListener, SetSplitCollector, SetSplitListener};
pub use dominance::{non_dominated_set, non_dominated_sorting, DominanceSplit};
pub use error::{Result, SmoopError};
pub use problem::{
    to_points, to_problem, Candidate, MetricSelection, Objective, Partition, Point, PointSet,
    Problem,
};
pub use rankers::{
    hybrid_non_dominated_sorting, linear_recursive_ranking, non_dominated_sorting_hl,
    non_dominated_sorting_ws, reference_point_hds,
};
pub use scalarize::{
    normalize, single, stats, to_p, weighted_sum, DimensionStats, ReferenceFrame,
    WeightedSumMethod, WeightedSumResult,
};
pub use scoring::{measure_distinctiveness, PerformanceMetrics, Scorer};
pub use strategy::{CandidateRanking, Ranker, RankingConfig, RankingStrategy};
