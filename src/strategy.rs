//! Named ranking strategies and the ranking facade.
//!
//! [`Ranker::apply`] is the low-level entry: it ranks a candidate slice in
//! place and writes the strict-order rank under the strategy id and the
//! partial-order rank under `<id>_po`. [`Ranker::rank`] adds input
//! validation and measure-safety filtering, then returns the candidates
//! sorted by rank.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collector::SetSplitCollector;
use crate::dominance::non_dominated_sorting;
use crate::error::{Result, SmoopError};
use crate::problem::{
    to_points, to_problem, Candidate, MetricSelection, Partition, Point, Problem,
    PARTIAL_ORDER_SUFFIX,
};
use crate::rankers::{
    flatten_checked, hybrid_non_dominated_sorting, linear_recursive_ranking,
    order_groups_by_distance, reference_point_hds,
};
use crate::scalarize::{single, to_p, weighted_sum, ReferenceFrame, WeightedSumMethod};
use crate::scoring::{PerformanceMetrics, Scorer};

// =============================================================================
// Strategies
// =============================================================================

/// A ranking strategy, identified externally by its string id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankingStrategy {
    /// Hybrid non-dominated sorting over prioritized objectives.
    #[serde(rename = "HDS_SMOOP")]
    Hds,
    /// HDS with indistinguishable groups ordered by reference-point distance.
    #[serde(rename = "RP_HDS_SMOOP")]
    RpHds,
    /// Flat non-dominated sorting.
    #[serde(rename = "NDS_SMOOP")]
    Nds,
    /// Flat non-dominated sorting, fronts ordered by reference-point distance.
    #[serde(rename = "RP_NDS_SMOOP")]
    RpNds,
    /// Linear recursive ranking.
    #[serde(rename = "LRR_SMOOP")]
    Lrr,
    /// Weighted sum of normalized objectives.
    #[serde(rename = "WEIGHTEDSUM_SMOOP")]
    WeightedSum,
    /// Weighted distance to the ideal vector.
    #[serde(rename = "WEIGHTEDEUCLIDEAN_SMOOP")]
    WeightedEuclidean,
    /// First selected objective only.
    #[serde(rename = "SINGLE_SMOOP")]
    Single,
    /// Reference-point distance only; every point is its own group.
    #[serde(rename = "NORM_WEIGHT_DISTANCE_SMOOP")]
    NormWeightDistance,
}

impl RankingStrategy {
    pub const ALL: [RankingStrategy; 9] = [
        RankingStrategy::Hds,
        RankingStrategy::RpHds,
        RankingStrategy::Nds,
        RankingStrategy::RpNds,
        RankingStrategy::Lrr,
        RankingStrategy::WeightedSum,
        RankingStrategy::WeightedEuclidean,
        RankingStrategy::Single,
        RankingStrategy::NormWeightDistance,
    ];

    pub fn id(self) -> &'static str {
        match self {
            RankingStrategy::Hds => "HDS_SMOOP",
            RankingStrategy::RpHds => "RP_HDS_SMOOP",
            RankingStrategy::Nds => "NDS_SMOOP",
            RankingStrategy::RpNds => "RP_NDS_SMOOP",
            RankingStrategy::Lrr => "LRR_SMOOP",
            RankingStrategy::WeightedSum => "WEIGHTEDSUM_SMOOP",
            RankingStrategy::WeightedEuclidean => "WEIGHTEDEUCLIDEAN_SMOOP",
            RankingStrategy::Single => "SINGLE_SMOOP",
            RankingStrategy::NormWeightDistance => "NORM_WEIGHT_DISTANCE_SMOOP",
        }
    }

    /// Ranking key of the partial-order rank.
    pub fn partial_order_id(self) -> String {
        format!("{}{PARTIAL_ORDER_SUFFIX}", self.id())
    }

    /// Strategies that store reference-point distances on candidates even
    /// without performance measurement.
    pub fn uses_reference_point(self) -> bool {
        matches!(
            self,
            RankingStrategy::RpHds | RankingStrategy::RpNds | RankingStrategy::NormWeightDistance
        )
    }

    /// Strategies that require weights summing to one.
    pub fn is_weighted(self) -> bool {
        matches!(
            self,
            RankingStrategy::WeightedSum | RankingStrategy::WeightedEuclidean
        )
    }
}

impl fmt::Display for RankingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for RankingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RankingStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.id() == s)
            .ok_or_else(|| format!("unknown ranking strategy: {s}"))
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Ranking configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Populate the performance metrics bundle in [`Ranker::rank`].
    pub measure_performance: bool,
    /// Depth of the top-N relevance metrics.
    pub relevance_top_n: usize,
    /// Absolute tolerance of the weights-sum-to-one check.
    pub weight_sum_tolerance: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            measure_performance: false,
            relevance_top_n: 10,
            weight_sum_tolerance: 1e-9,
        }
    }
}

// =============================================================================
// Ranking results
// =============================================================================

/// Candidates of one [`Ranker::rank`] call, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRanking {
    pub strategy: RankingStrategy,
    /// Ranked candidates ascending by strict-order rank, then unfit ones.
    pub candidates: Vec<Candidate>,
    /// Present when performance measurement was enabled.
    #[serde(default)]
    pub performance: Option<PerformanceMetrics>,
}

impl CandidateRanking {
    pub fn ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// Strict or partial-order rank of candidate `id` under this strategy.
    pub fn rank_of(&self, id: &str, partial_order: bool) -> Option<usize> {
        self.candidate(id)?.rank(self.strategy.id(), partial_order)
    }

    pub fn partial_order_cardinalities(&self) -> Vec<usize> {
        self.performance
            .as_ref()
            .map(PerformanceMetrics::partial_order_cardinalities)
            .unwrap_or_default()
    }
}

/// Strict order plus the groups used for the partial order.
#[derive(Debug, Clone, Default, PartialEq)]
struct RankedPoints {
    sorted_points: Vec<Point>,
    partition: Partition,
}

// =============================================================================
// Ranker
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Ranker {
    config: RankingConfig,
}

impl Ranker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Rank `candidates` in place with `strategy`.
    ///
    /// Every candidate, complete or not, receives a strict-order and a
    /// partial-order rank. When `metrics` is given it is filled with the
    /// quality bundle and candidates also receive normalized values.
    pub fn apply(
        &self,
        strategy: RankingStrategy,
        selection: &[MetricSelection],
        candidates: &mut [Candidate],
        metrics: Option<&mut PerformanceMetrics>,
    ) -> Result<()> {
        let mut problem = to_problem(selection);
        let point_set = to_points(selection, candidates);
        problem.points = point_set.points.clone();

        debug!(
            strategy = %strategy,
            points = problem.points.len(),
            incomplete = point_set.incomplete.len(),
            "Applying ranking strategy"
        );

        let ranked = self.order(strategy, &problem)?;

        let mut scorer = Scorer::new(&point_set, candidates);
        if strategy.uses_reference_point() {
            scorer.set_reference_point_distance_score(&problem.points, &problem.objectives, None)?;
        }
        scorer.score(&ranked.sorted_points, strategy.id())?;
        scorer.score_p(&ranked.partition, &strategy.partial_order_id())?;

        if let Some(metrics) = metrics {
            scorer.set_performance_measures(
                strategy.id(),
                &problem,
                &ranked.partition,
                &ranked.sorted_points,
                self.config.relevance_top_n,
                metrics,
            )?;
        }

        Ok(())
    }

    fn order(&self, strategy: RankingStrategy, problem: &Problem) -> Result<RankedPoints> {
        let expected = problem.points.len();
        let id = strategy.id();

        let ranked = match strategy {
            RankingStrategy::Hds => {
                let mut collector = SetSplitCollector::new();
                let fronts = hybrid_non_dominated_sorting(problem, &mut collector)?;
                RankedPoints {
                    sorted_points: flatten_checked(id, &fronts, expected)?,
                    partition: collector.non_distinguishable_sets(),
                }
            }
            RankingStrategy::RpHds => {
                let mut collector = SetSplitCollector::new();
                let groups = reference_point_hds(problem, &mut collector)?;
                RankedPoints {
                    sorted_points: flatten_checked(id, &groups, expected)?,
                    partition: groups,
                }
            }
            RankingStrategy::Nds => {
                let fronts = non_dominated_sorting(problem, None);
                RankedPoints {
                    sorted_points: flatten_checked(id, &fronts, expected)?,
                    partition: fronts,
                }
            }
            RankingStrategy::RpNds => {
                let frame = ReferenceFrame::new(&problem.objectives, &problem.points);
                let fronts = order_groups_by_distance(&frame, non_dominated_sorting(problem, None));
                RankedPoints {
                    sorted_points: flatten_checked(id, &fronts, expected)?,
                    partition: fronts,
                }
            }
            RankingStrategy::Lrr => {
                let mut collector = SetSplitCollector::new();
                let groups = linear_recursive_ranking(problem, &mut collector)?;
                RankedPoints {
                    sorted_points: flatten_checked(id, &groups, expected)?,
                    partition: collector.non_distinguishable_sets(),
                }
            }
            RankingStrategy::WeightedSum | RankingStrategy::WeightedEuclidean => {
                let method = if strategy == RankingStrategy::WeightedSum {
                    WeightedSumMethod::Default
                } else {
                    WeightedSumMethod::EuclideanDistance
                };
                let result = weighted_sum(problem, method, self.config.weight_sum_tolerance)?;
                RankedPoints {
                    sorted_points: flatten_checked(id, &result.partition, expected)?,
                    partition: result.partition,
                }
            }
            RankingStrategy::Single => {
                let sorted = single(&problem.objectives, &problem.points, None);
                let partition = to_p(&sorted, Some(0));
                RankedPoints {
                    sorted_points: flatten_checked(id, &partition, expected)?,
                    partition,
                }
            }
            RankingStrategy::NormWeightDistance => {
                let frame = ReferenceFrame::new(&problem.objectives, &problem.points);
                let sorted = order_groups_by_distance(&frame, vec![problem.points.clone()])
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>();
                let partition: Partition = sorted.iter().map(|p| vec![p.clone()]).collect();
                RankedPoints {
                    sorted_points: flatten_checked(id, &partition, expected)?,
                    partition,
                }
            }
        };

        debug!(
            strategy = %strategy,
            points = ranked.sorted_points.len(),
            groups = ranked.partition.len(),
            "Strategy ordering computed"
        );

        Ok(ranked)
    }

    /// Validate, filter unsafe candidates, rank and sort.
    ///
    /// Candidates with a `<metric>_safe` flag of zero for any selected metric
    /// are marked unsafe for this strategy and appended unranked after the
    /// ranked ones.
    pub fn rank(
        &self,
        strategy: RankingStrategy,
        selection: &[MetricSelection],
        candidates: Vec<Candidate>,
    ) -> Result<CandidateRanking> {
        if selection.is_empty() {
            return Err(SmoopError::EmptySelection);
        }
        if candidates.is_empty() {
            return Err(SmoopError::EmptyCandidates);
        }

        let id = strategy.id();
        let (mut fit, mut unfit): (Vec<Candidate>, Vec<Candidate>) = candidates
            .into_iter()
            .map(|mut candidate| {
                let safe = selection.iter().all(|m| candidate.is_safe_measure(&m.id));
                candidate.safe_criteria.insert(id.to_string(), safe);
                candidate
            })
            .partition(|candidate| candidate.safe_criteria.get(id).copied().unwrap_or(false));

        info!(
            strategy = %strategy,
            fit = fit.len(),
            unfit = unfit.len(),
            "Ranking candidates"
        );

        let mut performance = self
            .config
            .measure_performance
            .then(PerformanceMetrics::new);

        if !fit.is_empty() {
            self.apply(strategy, selection, &mut fit, performance.as_mut())?;
            fit.sort_by_key(|candidate| candidate.rank(id, false).unwrap_or(usize::MAX));
        }
        fit.append(&mut unfit);

        Ok(CandidateRanking {
            strategy,
            candidates: fit,
            performance,
        })
    }
}
