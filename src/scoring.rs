//! Ranks, reference-point distances and ranking quality metrics.
//!
//! [`Scorer`] walks a sorted point list (or a partition) through the
//! [`PointSet`] lookup and writes integer ranks into each candidate's
//! ranking map. Incomplete candidates always receive the worst ranks.
//! The point-based measures ([`relevance`], [`sum_relevance`],
//! [`partial_relevance`]) need no candidates and are used for the aggregate
//! metrics of a [`PerformanceMetrics`] bundle.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{Result, SmoopError};
use crate::problem::{
    Candidate, Objective, Partition, Point, PointSet, Problem, NORMALIZED_SUFFIX,
    PARTIAL_ORDER_SUFFIX,
};
use crate::scalarize::{normalize, stats, DimensionStats, ReferenceFrame};

/// Ranking entry holding a candidate's distance to the ideal vector.
pub const RP_DISTANCE_SCORE: &str = "rpDistanceScore";

pub const DISTINCTIVENESS: &str = "distinctiveness";
/// Alias of [`DISTINCTIVENESS`].
pub const DIVERSITY: &str = "diversity";
pub const NDS_SIZE: &str = "nds_size";
pub const INCOMPLETE_SIZE: &str = "incomplete_size";

// =============================================================================
// Performance metrics
// =============================================================================

/// Metric name -> value, populated by one ranking run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformanceMetrics {
    metrics: BTreeMap<String, f64>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.metrics.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Sizes of the indistinguishable groups, best group first.
    pub fn partial_order_cardinalities(&self) -> Vec<usize> {
        let groups = self.get(NDS_SIZE).map_or(0, |n| n.max(0.0) as usize);
        (0..groups)
            .map(|i| self.get(&format!("pi_{i}")).map_or(0, |n| n.max(0.0) as usize))
            .collect()
    }

    /// Raw statistics recorded for `metric_id`, if all five are present.
    pub fn objective_stats(&self, metric_id: &str) -> Option<DimensionStats> {
        let stat = |suffix: &str| self.get(&format!("{metric_id}_{suffix}"));
        Some(DimensionStats {
            min: stat("min")?,
            max: stat("max")?,
            mean: stat("mean")?,
            sum: stat("sum")?,
            stdev: stat("stdev")?,
        })
    }
}

// =============================================================================
// Point-based measures
// =============================================================================

/// Ratio of groups to points; 1.0 when every point is its own group.
pub fn measure_distinctiveness(set_size: usize, points_size: usize) -> f64 {
    if points_size == 0 {
        return 0.0;
    }
    set_size as f64 / points_size as f64
}

/// Number of leading entries to evaluate; `top_n` of zero is rejected.
fn ranking_length(len: usize, top_n: Option<usize>) -> Result<usize> {
    match top_n {
        Some(0) => Err(SmoopError::InvalidTopN { top_n: 0 }),
        Some(n) => Ok(n.min(len)),
        None => Ok(len),
    }
}

/// Σ distance / rank over the first `top_n` points (all when `None`).
///
/// Distances are measured in the frame of all `sorted_points`.
pub fn relevance(sorted_points: &[Point], objectives: &[Objective], top_n: Option<usize>) -> Result<f64> {
    let n = ranking_length(sorted_points.len(), top_n)?;
    let frame = ReferenceFrame::new(objectives, sorted_points);
    Ok(sorted_points[..n]
        .iter()
        .enumerate()
        .map(|(i, point)| frame.distance(point) / (i + 1) as f64)
        .sum())
}

/// Mean distance to the ideal over the first `top_n` points.
pub fn sum_relevance(
    sorted_points: &[Point],
    objectives: &[Objective],
    top_n: Option<usize>,
) -> Result<f64> {
    let n = ranking_length(sorted_points.len(), top_n)?;
    if n == 0 {
        return Ok(0.0);
    }
    let frame = ReferenceFrame::new(objectives, sorted_points);
    let total: f64 = sorted_points[..n].iter().map(|p| frame.distance(p)).sum();
    Ok(total / n as f64)
}

/// Σ distance / (group index + 1) over the first `top_n` points of the
/// partition, so every member of a group shares one rank weight.
pub fn partial_relevance(
    sorted_points: &[Point],
    partition: &Partition,
    objectives: &[Objective],
    top_n: Option<usize>,
) -> Result<f64> {
    let total_points = partition.iter().map(Vec::len).sum();
    let n = ranking_length(total_points, top_n)?;
    let frame = ReferenceFrame::new(objectives, sorted_points);

    Ok(partition
        .iter()
        .enumerate()
        .flat_map(|(i, group)| group.iter().map(move |point| (i, point)))
        .take(n)
        .map(|(i, point)| frame.distance(point) / (i + 1) as f64)
        .sum())
}

// =============================================================================
// Candidate scoring
// =============================================================================

/// Writes ranking entries onto the candidates of one [`PointSet`].
pub struct Scorer<'a> {
    point_set: &'a PointSet,
    candidates: &'a mut [Candidate],
}

impl<'a> Scorer<'a> {
    /// `point_set` must have been built from `candidates`.
    pub fn new(point_set: &'a PointSet, candidates: &'a mut [Candidate]) -> Self {
        Self {
            point_set,
            candidates,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        self.candidates
    }

    fn set_for_point(&mut self, point: &Point, key: &str, value: f64) {
        let Some(indices) = self.point_set.candidates_at(point) else {
            return;
        };
        for &idx in indices {
            if let Some(candidate) = self.candidates.get_mut(idx) {
                candidate.set_score(key, value);
            }
        }
    }

    fn score_incomplete(&mut self, mut counter: usize, ranking_id: &str) -> usize {
        for &idx in &self.point_set.incomplete {
            counter += 1;
            if let Some(candidate) = self.candidates.get_mut(idx) {
                candidate.set_score(ranking_id, counter as f64);
            }
        }
        counter
    }

    /// Strict order: one consecutive rank per candidate, walking
    /// `sorted_points` and skipping repeated points.
    pub fn score(&mut self, sorted_points: &[Point], ranking_id: &str) -> Result<()> {
        let mut counter = 0usize;
        let mut visited = HashSet::new();

        for point in sorted_points {
            if !visited.insert(point.key()) {
                continue;
            }
            let Some(indices) = self.point_set.candidates_at(point) else {
                continue;
            };
            for &idx in indices {
                counter += 1;
                if counter > sorted_points.len() {
                    return Err(SmoopError::RankOverflow {
                        score: counter,
                        max: sorted_points.len(),
                    });
                }
                if let Some(candidate) = self.candidates.get_mut(idx) {
                    candidate.set_score(ranking_id, counter as f64);
                }
            }
        }

        let last = self.score_incomplete(counter, ranking_id);
        debug!(ranking_id, ranked = counter, total = last, "Scored strict order");
        Ok(())
    }

    /// Partial order: the 1-based index of the group holding the candidate.
    pub fn score_p(&mut self, partition: &Partition, ranking_id: &str) -> Result<()> {
        let mut counter = 0usize;
        let mut visited = HashSet::new();

        for group in partition {
            if group.is_empty() {
                continue;
            }
            counter += 1;
            if counter > partition.len() {
                return Err(SmoopError::RankOverflow {
                    score: counter,
                    max: partition.len(),
                });
            }
            for point in group {
                if visited.insert(point.key()) {
                    self.set_for_point(point, ranking_id, counter as f64);
                }
            }
        }

        let last = self.score_incomplete(counter, ranking_id);
        debug!(ranking_id, groups = counter, total = last, "Scored partial order");
        Ok(())
    }

    /// Store each point's distance to the ideal vector under
    /// [`RP_DISTANCE_SCORE`] on every candidate sharing it.
    pub fn set_reference_point_distance_score(
        &mut self,
        sorted_points: &[Point],
        objectives: &[Objective],
        top_n: Option<usize>,
    ) -> Result<()> {
        let n = ranking_length(sorted_points.len(), top_n)?;
        let frame = ReferenceFrame::new(objectives, sorted_points);
        trace!(ideal = ?frame.ideal(), "Reference point");

        for point in &sorted_points[..n] {
            let distance = frame.distance(point);
            self.set_for_point(point, RP_DISTANCE_SCORE, distance);
        }
        Ok(())
    }

    /// Σ distance / rank over the candidates of the first `top_n` points.
    ///
    /// Reads [`RP_DISTANCE_SCORE`] and `ranking_id` from each candidate; a
    /// candidate is counted once even if its point repeats.
    pub fn measure_relevance(
        &self,
        ranking_id: &str,
        sorted_points: &[Point],
        top_n: Option<usize>,
    ) -> Result<f64> {
        let n = ranking_length(sorted_points.len(), top_n)?;
        let mut visited = HashSet::new();
        let mut total = 0.0;

        for point in &sorted_points[..n] {
            if !visited.insert(point.key()) {
                continue;
            }
            let Some(indices) = self.point_set.candidates_at(point) else {
                continue;
            };
            for candidate in indices.iter().filter_map(|&i| self.candidates.get(i)) {
                match (candidate.score(RP_DISTANCE_SCORE), candidate.score(ranking_id)) {
                    (Some(distance), Some(rank)) if rank > 0.0 => total += distance / rank,
                    _ => warn!(
                        candidate = %candidate.id,
                        ranking_id,
                        "Candidate lacks rank or distance; skipped in relevance"
                    ),
                }
            }
        }

        Ok(total)
    }

    /// Store `<metric>_norm` in `[0, 1]` on every candidate, 1 being best.
    pub fn set_normalized_values(&mut self, problem: &Problem, sorted_points: &[Point]) {
        let normalized = normalize(sorted_points, None);

        for (point, norm) in sorted_points.iter().zip(normalized) {
            for ((value, objective), id) in norm
                .values()
                .iter()
                .zip(&problem.objectives)
                .zip(&problem.ids)
            {
                let value = match objective {
                    Objective::Minimize => 1.0 - value,
                    Objective::Maximize => *value,
                };
                self.set_for_point(point, &format!("{id}{NORMALIZED_SUFFIX}"), value);
            }
        }
    }

    /// Fill `metrics` with the full quality bundle of one ranking.
    ///
    /// `partition` holds the indistinguishable groups and `sorted_points`
    /// the strict order; both ranks must already be scored.
    pub fn set_performance_measures(
        &mut self,
        ranking_id: &str,
        problem: &Problem,
        partition: &Partition,
        sorted_points: &[Point],
        top_n: usize,
        metrics: &mut PerformanceMetrics,
    ) -> Result<()> {
        let objectives = &problem.objectives;
        let partial_id = format!("{ranking_id}{PARTIAL_ORDER_SUFFIX}");
        let top = Some(top_n);

        self.set_reference_point_distance_score(sorted_points, objectives, None)?;

        let distinctiveness = measure_distinctiveness(partition.len(), sorted_points.len());
        metrics.insert(DISTINCTIVENESS, distinctiveness);
        metrics.insert(DIVERSITY, distinctiveness);

        metrics.insert("relevance_so", self.measure_relevance(ranking_id, sorted_points, None)?);
        metrics.insert(
            format!("relevance_top{top_n}_so"),
            self.measure_relevance(ranking_id, sorted_points, top)?,
        );
        metrics.insert("relevance_po", self.measure_relevance(&partial_id, sorted_points, None)?);
        metrics.insert(
            format!("relevance_top{top_n}_po"),
            self.measure_relevance(&partial_id, sorted_points, top)?,
        );

        metrics.insert("sum_relevance", sum_relevance(sorted_points, objectives, None)?);
        metrics.insert(
            format!("sum_relevance_top{top_n}"),
            sum_relevance(sorted_points, objectives, top)?,
        );
        metrics.insert(
            "partial_relevance",
            partial_relevance(sorted_points, partition, objectives, None)?,
        );
        metrics.insert(
            format!("partial_relevance_top{top_n}"),
            partial_relevance(sorted_points, partition, objectives, top)?,
        );

        metrics.insert(NDS_SIZE, partition.len() as f64);
        for (i, group) in partition.iter().enumerate() {
            metrics.insert(format!("pi_{i}"), group.len() as f64);
        }
        metrics.insert(INCOMPLETE_SIZE, self.point_set.incomplete.len() as f64);

        self.set_normalized_values(problem, sorted_points);

        for (id, dim) in problem.ids.iter().zip(stats(sorted_points)) {
            metrics.insert(format!("{id}_min"), dim.min);
            metrics.insert(format!("{id}_max"), dim.max);
            metrics.insert(format!("{id}_mean"), dim.mean);
            metrics.insert(format!("{id}_sum"), dim.sum);
            metrics.insert(format!("{id}_stdev"), dim.stdev);
        }

        debug!(
            ranking_id,
            distinctiveness,
            groups = partition.len(),
            "Performance measures recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{to_points, MetricSelection};
    use crate::scalarize::{single, to_p};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn one_dim(values: &[Option<f64>]) -> (Vec<MetricSelection>, Vec<Candidate>) {
        let selection = vec![MetricSelection::minimize("x")];
        let candidates = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let c = Candidate::new(format!("c{i}"));
                match v {
                    Some(v) => c.with_metric("x", *v),
                    None => c,
                }
            })
            .collect();
        (selection, candidates)
    }

    fn ranks(candidates: &[Candidate], key: &str) -> Vec<usize> {
        candidates
            .iter()
            .map(|c| c.score(key).unwrap_or(-1.0) as usize)
            .collect()
    }

    #[test]
    fn score_orders_ties_by_candidate_order() {
        let (selection, mut candidates) = one_dim(&[Some(3.0), Some(1.0), Some(2.0), Some(1.0)]);
        let set = to_points(&selection, &candidates);
        let sorted = single(&[Objective::Minimize], &set.points, None);
        let partition = to_p(&sorted, Some(0));

        let mut scorer = Scorer::new(&set, &mut candidates);
        scorer.score(&sorted, "S").unwrap();
        scorer.score_p(&partition, "S_po").unwrap();

        assert_eq!(ranks(&candidates, "S"), vec![4, 1, 3, 2]);
        assert_eq!(ranks(&candidates, "S_po"), vec![3, 1, 2, 1]);
    }

    #[test]
    fn incomplete_candidates_rank_last() {
        let (selection, mut candidates) = one_dim(&[None, Some(2.0), Some(1.0)]);
        let set = to_points(&selection, &candidates);
        let sorted = single(&[Objective::Minimize], &set.points, None);

        Scorer::new(&set, &mut candidates).score(&sorted, "S").unwrap();
        assert_eq!(ranks(&candidates, "S"), vec![3, 2, 1]);

        Scorer::new(&set, &mut candidates)
            .score_p(&to_p(&sorted, None), "S_po")
            .unwrap();
        assert_eq!(ranks(&candidates, "S_po"), vec![3, 2, 1]);
    }

    #[test]
    fn score_rejects_a_list_shorter_than_its_candidates() {
        let (selection, mut candidates) = one_dim(&[Some(1.0), Some(1.0)]);
        let set = to_points(&selection, &candidates);
        let err = Scorer::new(&set, &mut candidates)
            .score(&[Point::from([1.0])], "S")
            .unwrap_err();
        assert_eq!(err, SmoopError::RankOverflow { score: 2, max: 1 });
    }

    #[test]
    fn distinctiveness_is_group_ratio() {
        assert_eq!(measure_distinctiveness(1, 3), 1.0 / 3.0);
        assert_eq!(measure_distinctiveness(4, 4), 1.0);
        assert_eq!(measure_distinctiveness(0, 0), 0.0);
    }

    #[test]
    fn relevance_measures_weight_by_rank() {
        let objectives = [Objective::Minimize];
        let sorted = vec![Point::from([0.0]), Point::from([1.0]), Point::from([2.0])];

        // Distances 0, 0.5, 1.
        assert!(approx(relevance(&sorted, &objectives, None).unwrap(), 0.25 + 1.0 / 3.0));
        assert!(approx(relevance(&sorted, &objectives, Some(2)).unwrap(), 0.25));
        assert!(approx(sum_relevance(&sorted, &objectives, None).unwrap(), 0.5));
        assert!(approx(sum_relevance(&sorted, &objectives, Some(10)).unwrap(), 0.5));

        let partition = vec![vec![sorted[0].clone(), sorted[1].clone()], vec![sorted[2].clone()]];
        assert!(approx(
            partial_relevance(&sorted, &partition, &objectives, None).unwrap(),
            0.5 + 0.5
        ));

        assert_eq!(
            relevance(&sorted, &objectives, Some(0)).unwrap_err(),
            SmoopError::InvalidTopN { top_n: 0 }
        );
        assert_eq!(relevance(&[], &objectives, None).unwrap(), 0.0);
    }

    #[test]
    fn performance_bundle_has_expected_keys() {
        let (selection, mut candidates) = one_dim(&[Some(3.0), Some(1.0), None, Some(1.0)]);
        let mut problem = crate::problem::to_problem(&selection);
        let set = to_points(&selection, &candidates);
        problem.points = set.points.clone();

        let sorted = single(&problem.objectives, &problem.points, None);
        let partition = to_p(&sorted, Some(0));
        let mut metrics = PerformanceMetrics::new();

        let mut scorer = Scorer::new(&set, &mut candidates);
        scorer.score(&sorted, "S").unwrap();
        scorer.score_p(&partition, "S_po").unwrap();
        scorer
            .set_performance_measures("S", &problem, &partition, &sorted, 10, &mut metrics)
            .unwrap();

        assert_eq!(metrics.get(DISTINCTIVENESS), Some(2.0 / 3.0));
        assert_eq!(metrics.get(DIVERSITY), Some(2.0 / 3.0));
        assert_eq!(metrics.get(NDS_SIZE), Some(2.0));
        assert_eq!(metrics.get(INCOMPLETE_SIZE), Some(1.0));
        assert_eq!(metrics.partial_order_cardinalities(), vec![2, 1]);
        for key in [
            "relevance_so",
            "relevance_top10_so",
            "relevance_po",
            "relevance_top10_po",
            "sum_relevance_top10",
            "partial_relevance_top10",
        ] {
            assert!(metrics.get(key).is_some(), "missing {key}");
        }

        let x = metrics.objective_stats("x").unwrap();
        assert_eq!((x.min, x.max, x.sum), (1.0, 3.0, 5.0));

        // Best value (minimized) normalizes to 1, worst to 0.
        assert_eq!(candidates[1].normalized_measures().get("x"), Some(&1.0));
        assert_eq!(candidates[0].normalized_measures().get("x"), Some(&0.0));
        assert!(candidates[2].normalized_measures().is_empty());
        assert_eq!(candidates[0].score(RP_DISTANCE_SCORE), Some(1.0));
    }
}
