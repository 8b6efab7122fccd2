//! Normalization, duality and scalar orderings.
//!
//! Every scalarizing ranker works on points rescaled to `[0, 1]` per
//! dimension. Maximize dimensions are negated afterwards so that smaller is
//! better everywhere. [`ReferenceFrame`] fixes one such rescaling and the
//! ideal vector derived from it, so that distances computed for different
//! subsets of the points stay comparable.

use std::cmp::Ordering;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, trace};

use crate::error::{Result, SmoopError};
use crate::problem::{Objective, Partition, Point, Problem};

// =============================================================================
// Statistics & normalization
// =============================================================================

/// Summary statistics of one dimension across a point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
    /// Population standard deviation.
    pub stdev: f64,
}

impl DimensionStats {
    fn from_values(values: &[f64]) -> Self {
        Self {
            min: Statistics::min(values),
            max: Statistics::max(values),
            mean: Statistics::mean(values),
            sum: values.iter().sum(),
            stdev: Statistics::population_std_dev(values),
        }
    }

    /// Divisor used to rescale into `[0, 1]`; 1 when the dimension is constant.
    fn range(&self) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 {
            1.0
        } else {
            range
        }
    }

    fn rescale(&self, value: f64) -> f64 {
        (value - self.min) / self.range()
    }
}

/// Per-dimension statistics; the dimension count is taken from the first point.
///
/// Returns an empty vector for an empty point set.
pub fn stats(points: &[Point]) -> Vec<DimensionStats> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    (0..first.dims())
        .map(|dim| {
            let values: Vec<f64> = points.iter().filter_map(|p| p.get(dim)).collect();
            DimensionStats::from_values(&values)
        })
        .collect()
}

/// Rescale every value to `[0, 1]` using `(v - min) / (max - min)`.
///
/// Constant dimensions map to 0. When `stats_per_dim` is given it is used
/// instead of the statistics of `points` themselves.
pub fn normalize(points: &[Point], stats_per_dim: Option<&[DimensionStats]>) -> Vec<Point> {
    let owned;
    let stats_per_dim = match stats_per_dim {
        Some(given) => given,
        None => {
            owned = stats(points);
            &owned
        }
    };

    points
        .iter()
        .map(|point| {
            Point(
                point
                    .values()
                    .iter()
                    .zip(stats_per_dim)
                    .map(|(&value, dim)| dim.rescale(value))
                    .collect(),
            )
        })
        .collect()
}

/// Negate maximize dimensions so that smaller is better everywhere.
fn apply_duality(objectives: &[Objective], values: &mut [f64]) {
    for (value, objective) in values.iter_mut().zip(objectives) {
        if *objective == Objective::Maximize {
            *value = -*value;
        }
    }
}

// =============================================================================
// Reference frame
// =============================================================================

/// Normalization and ideal vector fixed over one point set.
#[derive(Debug, Clone)]
pub struct ReferenceFrame {
    objectives: Vec<Objective>,
    stats: Vec<DimensionStats>,
    ideal: DVector<f64>,
}

impl ReferenceFrame {
    /// Fix the frame over `points`: their raw statistics drive normalization
    /// and the ideal is the best normalized value reached in each dimension.
    pub fn new(objectives: &[Objective], points: &[Point]) -> Self {
        let stats = stats(points);
        let mut ideal = vec![f64::INFINITY; stats.len()];

        for point in points {
            let dual = dual_values(objectives, &stats, point);
            for (best, value) in ideal.iter_mut().zip(dual) {
                *best = best.min(value);
            }
        }

        Self {
            objectives: objectives.to_vec(),
            stats,
            ideal: DVector::from_vec(ideal),
        }
    }

    pub fn ideal(&self) -> &[f64] {
        self.ideal.as_slice()
    }

    pub fn stats(&self) -> &[DimensionStats] {
        &self.stats
    }

    /// Normalized, duality-adjusted coordinates of `point` in this frame.
    pub fn dual(&self, point: &Point) -> DVector<f64> {
        DVector::from_vec(dual_values(&self.objectives, &self.stats, point))
    }

    /// Euclidean distance of `point` to the ideal vector. Smaller is better.
    pub fn distance(&self, point: &Point) -> f64 {
        let dual = self.dual(point);
        if dual.len() != self.ideal.len() {
            return f64::NAN;
        }
        (dual - &self.ideal).norm()
    }
}

fn dual_values(objectives: &[Objective], stats: &[DimensionStats], point: &Point) -> Vec<f64> {
    let mut values: Vec<f64> = point
        .values()
        .iter()
        .zip(stats)
        .map(|(&value, dim)| dim.rescale(value))
        .collect();
    apply_duality(objectives, &mut values);
    values
}

// =============================================================================
// Weighted sum
// =============================================================================

/// How a normalized point is reduced to one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightedSumMethod {
    /// Dot product of weights and the duality-adjusted point.
    Default,
    /// Distance between the ideal vector and the weighted point.
    EuclideanDistance,
}

/// Points ordered by their weighted scalar, ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightedSumResult {
    pub sorted_points: Vec<Point>,
    /// Scalar of each entry of `sorted_points`.
    pub scores: Vec<f64>,
    /// Consecutive points with identical scalars.
    pub partition: Partition,
}

/// Validate that `weights` sum to one within `tolerance`.
pub fn check_weights(weights: &[f64], tolerance: f64) -> Result<()> {
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > tolerance {
        return Err(SmoopError::WeightSum { sum });
    }
    Ok(())
}

/// Rank the problem's points by a weighted scalar (smaller is better).
///
/// Fails when the weights do not sum to one or do not match the point
/// dimensionality.
pub fn weighted_sum(
    problem: &Problem,
    method: WeightedSumMethod,
    tolerance: f64,
) -> Result<WeightedSumResult> {
    check_weights(&problem.weights, tolerance)?;

    if problem.points.is_empty() {
        return Ok(WeightedSumResult::default());
    }

    let dims = problem.objectives.len();
    if problem.weights.len() != dims {
        return Err(SmoopError::DimensionMismatch {
            expected: dims,
            actual: problem.weights.len(),
        });
    }
    if let Some(point) = problem.points.iter().find(|p| p.dims() != dims) {
        return Err(SmoopError::DimensionMismatch {
            expected: dims,
            actual: point.dims(),
        });
    }

    let frame = ReferenceFrame::new(&problem.objectives, &problem.points);
    let weights = DVector::from_column_slice(&problem.weights);

    let scalars: Vec<f64> = problem
        .points
        .iter()
        .map(|point| {
            let dual = frame.dual(point);
            let scalar = match method {
                WeightedSumMethod::Default => weights.dot(&dual),
                WeightedSumMethod::EuclideanDistance => {
                    (weights.component_mul(&dual) - &frame.ideal).norm()
                }
            };
            trace!(point = %point, scalar, ?method, "Weighted scalar");
            scalar
        })
        .collect();

    let mut order: Vec<usize> = (0..problem.points.len()).collect();
    order.sort_by(|&a, &b| {
        scalars[a]
            .partial_cmp(&scalars[b])
            .unwrap_or(Ordering::Equal)
    });

    let sorted_points: Vec<Point> = order.iter().map(|&i| problem.points[i].clone()).collect();
    let scores: Vec<f64> = order.iter().map(|&i| scalars[i]).collect();
    let partition = group_by_score(&sorted_points, &scores);

    debug!(
        points = sorted_points.len(),
        groups = partition.len(),
        ?method,
        "Weighted sum ranking finished"
    );

    Ok(WeightedSumResult {
        sorted_points,
        scores,
        partition,
    })
}

fn group_by_score(sorted_points: &[Point], scores: &[f64]) -> Partition {
    let mut partition: Partition = Vec::new();
    let mut last: Option<f64> = None;

    for (point, &score) in sorted_points.iter().zip(scores) {
        match (last, partition.last_mut()) {
            (Some(prev), Some(group)) if prev == score => group.push(point.clone()),
            _ => partition.push(vec![point.clone()]),
        }
        last = Some(score);
    }

    partition
}

// =============================================================================
// Single-objective ordering & grouping
// =============================================================================

/// Stable sort on one dimension (0 when unspecified), best first.
pub fn single(objectives: &[Objective], points: &[Point], sub_objective: Option<usize>) -> Vec<Point> {
    let dim = sub_objective.unwrap_or(0);
    let objective = objectives.get(dim).copied().unwrap_or(Objective::Minimize);

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| {
        let (a, b) = (a.get(dim), b.get(dim));
        let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match objective {
            Objective::Minimize => ordering,
            Objective::Maximize => ordering.reverse(),
        }
    });
    sorted
}

/// Group consecutive equal points of an already sorted list.
///
/// With `objective_index` only that dimension is compared, otherwise the
/// whole point.
pub fn to_p(sorted_points: &[Point], objective_index: Option<usize>) -> Partition {
    let same = |a: &Point, b: &Point| match objective_index {
        Some(dim) => a.get(dim) == b.get(dim),
        None => a.values() == b.values(),
    };

    let mut partition: Partition = Vec::new();
    for point in sorted_points {
        match partition.last_mut() {
            Some(group) if group.last().is_some_and(|last| same(last, point)) => {
                group.push(point.clone())
            }
            _ => partition.push(vec![point.clone()]),
        }
    }
    partition
}

/// Concatenate the groups of a partition in order.
pub fn flatten(partition: &[Vec<Point>]) -> Vec<Point> {
    partition.iter().flatten().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Objective = Objective::Minimize;
    const MAX: Objective = Objective::Maximize;

    fn pts(values: &[&[f64]]) -> Vec<Point> {
        values.iter().map(|v| Point(v.to_vec())).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn stats_use_population_deviation() {
        let s = stats(&pts(&[&[1.0], &[3.0]]));
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].min, 1.0);
        assert_eq!(s[0].max, 3.0);
        assert_eq!(s[0].mean, 2.0);
        assert_eq!(s[0].sum, 4.0);
        assert!(approx(s[0].stdev, 1.0));
        assert!(stats(&[]).is_empty());
    }

    #[test]
    fn normalize_maps_extremes_to_unit_bounds() {
        let normalized = normalize(&pts(&[&[10.0, 7.0], &[20.0, 7.0], &[15.0, 7.0]]), None);
        assert_eq!(normalized, pts(&[&[0.0, 0.0], &[1.0, 0.0], &[0.5, 0.0]]));
    }

    #[test]
    fn reference_frame_ideal_is_best_per_direction() {
        let points = pts(&[&[1.0, 10.0], &[3.0, 20.0]]);
        let frame = ReferenceFrame::new(&[MIN, MAX], &points);
        assert_eq!(frame.ideal(), &[0.0, -1.0]);
        assert!(approx(frame.distance(&points[0]), 1.0));
        assert!(approx(frame.distance(&points[1]), 1.0));
        assert!(approx(frame.distance(&Point::from([1.0, 20.0])), 0.0));
    }

    #[test]
    fn weighted_sum_orders_by_dot_product() {
        let problem = Problem::new(vec![MIN, MAX], pts(&[&[3.0, 1.0], &[1.0, 3.0], &[2.0, 2.0]]))
            .with_weights(vec![0.5, 0.5]);
        let result = weighted_sum(&problem, WeightedSumMethod::Default, 1e-9).unwrap();
        assert_eq!(result.sorted_points[0], Point::from([1.0, 3.0]));
        assert_eq!(result.sorted_points[2], Point::from([3.0, 1.0]));
        assert!(approx(result.scores[0], -0.5));
        assert_eq!(result.partition.len(), 3);
    }

    #[test]
    fn weighted_sum_groups_equal_scalars() {
        let problem = Problem::new(vec![MIN, MIN], pts(&[&[0.0, 1.0], &[1.0, 0.0], &[1.0, 1.0]]))
            .with_weights(vec![0.5, 0.5]);
        let result = weighted_sum(&problem, WeightedSumMethod::Default, 1e-9).unwrap();
        assert_eq!(result.partition.len(), 2);
        assert_eq!(result.partition[0].len(), 2);
    }

    #[test]
    fn weighted_euclidean_prefers_points_near_ideal() {
        let problem = Problem::new(vec![MIN, MIN], pts(&[&[1.0, 1.0], &[0.0, 0.0]]))
            .with_weights(vec![0.5, 0.5]);
        let result = weighted_sum(&problem, WeightedSumMethod::EuclideanDistance, 1e-9).unwrap();
        assert_eq!(result.sorted_points[0], Point::from([0.0, 0.0]));
        assert!(approx(result.scores[0], 0.0));
    }

    #[test]
    fn weights_must_sum_to_one() {
        let points = pts(&[&[1.0, 2.0]]);
        for weights in [vec![0.5, 0.4], vec![0.6, 0.5]] {
            let problem = Problem::new(vec![MIN, MIN], points.clone()).with_weights(weights);
            let err = weighted_sum(&problem, WeightedSumMethod::Default, 1e-9).unwrap_err();
            assert!(matches!(err, SmoopError::WeightSum { .. }));
        }
        let problem = Problem::new(vec![MIN, MIN, MIN], pts(&[&[1.0, 2.0, 3.0]]))
            .with_weights(vec![0.7, 0.2, 0.1]);
        assert!(weighted_sum(&problem, WeightedSumMethod::Default, 1e-9).is_ok());
    }

    #[test]
    fn single_sorts_on_one_dimension_stably() {
        let points = pts(&[&[3.0], &[1.0], &[2.0], &[1.0]]);
        assert_eq!(
            single(&[MIN], &points, None),
            pts(&[&[1.0], &[1.0], &[2.0], &[3.0]])
        );
        assert_eq!(
            single(&[MAX], &points, Some(0)),
            pts(&[&[3.0], &[2.0], &[1.0], &[1.0]])
        );
    }

    #[test]
    fn to_p_groups_runs_of_equal_points() {
        let sorted = pts(&[&[1.0, 5.0], &[1.0, 6.0], &[2.0, 6.0]]);
        assert_eq!(to_p(&sorted, Some(0)).len(), 2);
        assert_eq!(to_p(&sorted, Some(1)).len(), 2);
        assert_eq!(to_p(&sorted, None).len(), 3);
        assert_eq!(flatten(&to_p(&sorted, Some(0))), sorted);
        assert!(to_p(&[], None).is_empty());
    }
}
