//! Candidates, metric selections and the numeric problem built from them.
//!
//! A ranking run starts from a list of [`Candidate`]s and an ordered
//! [`MetricSelection`] list. [`to_problem`] extracts the per-objective
//! directions, weights and priorities; [`to_points`] turns every candidate
//! into a [`Point`] (one value per selected metric) and keeps a lookup from
//! the point's key back to the candidates that share it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SmoopError;

/// Suffix of the per-metric flag marking a measurement as unsafe for ranking.
pub const SAFE_MEASURE_FLAG_SUFFIX: &str = "_safe";

/// Suffix of the normalized per-metric values stored on ranked candidates.
pub const NORMALIZED_SUFFIX: &str = "_norm";

/// Suffix of the partial-order rank entry for a strategy id.
pub const PARTIAL_ORDER_SUFFIX: &str = "_po";

// =============================================================================
// Objectives & metric selection
// =============================================================================

/// Direction of a single objective.
///
/// Serialized as `0` (minimize) and `1` (maximize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Objective {
    Minimize,
    Maximize,
}

impl Objective {
    /// Is `a` strictly better than `b` under this direction?
    pub fn better(self, a: f64, b: f64) -> bool {
        match self {
            Objective::Minimize => a < b,
            Objective::Maximize => a > b,
        }
    }
}

impl TryFrom<u8> for Objective {
    type Error = SmoopError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Objective::Minimize),
            1 => Ok(Objective::Maximize),
            value => Err(SmoopError::InvalidObjective { value }),
        }
    }
}

impl From<Objective> for u8 {
    fn from(objective: Objective) -> Self {
        match objective {
            Objective::Minimize => 0,
            Objective::Maximize => 1,
        }
    }
}

/// One selected metric of a ranking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSelection {
    /// Metric identifier, looked up in [`Candidate::metrics`].
    pub id: String,
    /// Minimize (0) or maximize (1).
    pub objective: Objective,
    /// Fraction used by weighted strategies; weights of a selection sum to 1.
    #[serde(default)]
    pub weight: f64,
    /// Higher priorities are refined first; equal priorities form one group.
    #[serde(default)]
    pub priority: i64,
}

impl MetricSelection {
    pub fn new(id: impl Into<String>, objective: Objective, weight: f64, priority: i64) -> Self {
        Self {
            id: id.into(),
            objective,
            weight,
            priority,
        }
    }

    pub fn minimize(id: impl Into<String>) -> Self {
        Self::new(id, Objective::Minimize, 1.0, 1)
    }

    pub fn maximize(id: impl Into<String>) -> Self {
        Self::new(id, Objective::Maximize, 1.0, 1)
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }
}

// =============================================================================
// Candidates
// =============================================================================

/// A scored software component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable identifier.
    pub id: String,
    /// Metric id -> measured value. Missing or non-finite values make the
    /// candidate incomplete for any selection that uses the metric.
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    /// Ranking entry -> score. Written by the scoring layer only.
    #[serde(default)]
    pub ranking: BTreeMap<String, f64>,
    /// Strategy id -> whether every selected measure was safe to rank on.
    #[serde(default)]
    pub safe_criteria: BTreeMap<String, bool>,
}

impl Candidate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, metric_id: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(metric_id.into(), value);
        self
    }

    /// Numeric measurement for `metric_id`, if present and finite.
    pub fn measure(&self, metric_id: &str) -> Option<f64> {
        self.metrics
            .get(metric_id)
            .copied()
            .filter(|value| value.is_finite())
    }

    /// A measure is safe unless a `<metric>_safe` flag exists and is zero.
    pub fn is_safe_measure(&self, metric_id: &str) -> bool {
        if self.metrics.is_empty() {
            return false;
        }
        let flag = format!("{metric_id}{SAFE_MEASURE_FLAG_SUFFIX}");
        match self.metrics.get(&flag) {
            Some(value) => value.trunc() != 0.0,
            None => true,
        }
    }

    pub fn set_score(&mut self, key: impl Into<String>, score: f64) {
        self.ranking.insert(key.into(), score);
    }

    pub fn score(&self, key: &str) -> Option<f64> {
        self.ranking.get(key).copied()
    }

    /// Rank assigned by `strategy_id`; the partial-order rank when
    /// `partial_order` is set (candidates of one indifference group share it).
    pub fn rank(&self, strategy_id: &str, partial_order: bool) -> Option<usize> {
        let value = if partial_order {
            self.score(&format!("{strategy_id}{PARTIAL_ORDER_SUFFIX}"))
        } else {
            self.score(strategy_id)
        }?;
        (value >= 0.0).then_some(value as usize)
    }

    /// Normalized selected measures in `[0, 1]`, 1 being best in both directions.
    pub fn normalized_measures(&self) -> BTreeMap<String, f64> {
        self.ranking
            .iter()
            .filter_map(|(key, value)| {
                key.strip_suffix(NORMALIZED_SUFFIX)
                    .map(|metric| (metric.to_string(), *value))
            })
            .collect()
    }
}

// =============================================================================
// Points & problems
// =============================================================================

/// One measurement vector, one value per selected metric.
///
/// Two points are the same point when their [`Point::key`]s match; no
/// floating-point tolerance is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Point(pub Vec<f64>);

impl Point {
    /// Component-wise string serialization used for equality and lookup.
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn dims(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, dim: usize) -> Option<f64> {
        self.0.get(dim).copied()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

impl From<Vec<f64>> for Point {
    fn from(values: Vec<f64>) -> Self {
        Point(values)
    }
}

impl<const N: usize> From<[f64; N]> for Point {
    fn from(values: [f64; N]) -> Self {
        Point(values.to_vec())
    }
}

/// Ordered groups of points, best group first.
pub type Partition = Vec<Vec<Point>>;

/// Parallel per-objective arrays plus the points being ranked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Problem {
    pub objectives: Vec<Objective>,
    pub weights: Vec<f64>,
    pub priorities: Vec<i64>,
    pub ids: Vec<String>,
    pub points: Vec<Point>,
}

impl Problem {
    pub fn new(objectives: Vec<Objective>, points: Vec<Point>) -> Self {
        let n = objectives.len();
        Self {
            objectives,
            weights: vec![1.0 / n.max(1) as f64; n],
            priorities: vec![1; n],
            ids: (0..n).map(|i| format!("o{i}")).collect(),
            points,
        }
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_priorities(mut self, priorities: Vec<i64>) -> Self {
        self.priorities = priorities;
        self
    }

    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    /// Same objectives, weights and priorities over a subset of points.
    pub fn subproblem(&self, points: Vec<Point>) -> Problem {
        Problem {
            objectives: self.objectives.clone(),
            weights: self.weights.clone(),
            priorities: self.priorities.clone(),
            ids: self.ids.clone(),
            points,
        }
    }
}

/// Points extracted from a candidate list plus the way back to the candidates.
///
/// Candidates are referenced by their index in the slice passed to
/// [`to_points`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    /// Candidates missing at least one selected measurement, in input order.
    pub incomplete: Vec<usize>,
    /// One point per complete candidate, in input order (duplicates kept).
    pub points: Vec<Point>,
    /// Point key -> candidates sharing exactly that measurement vector.
    pub lookup: HashMap<String, Vec<usize>>,
}

impl PointSet {
    pub fn candidates_at(&self, point: &Point) -> Option<&[usize]> {
        self.lookup.get(&point.key()).map(Vec::as_slice)
    }

    pub fn candidate_count(&self) -> usize {
        self.points.len() + self.incomplete.len()
    }
}

/// Parallel arrays of directions, weights, priorities and ids, in selection order.
pub fn to_problem(selected: &[MetricSelection]) -> Problem {
    Problem {
        objectives: selected.iter().map(|m| m.objective).collect(),
        weights: selected.iter().map(|m| m.weight).collect(),
        priorities: selected.iter().map(|m| m.priority).collect(),
        ids: selected.iter().map(|m| m.id.clone()).collect(),
        points: Vec::new(),
    }
}

/// Build one point per complete candidate and the key -> candidates lookup.
///
/// Reading stops at the first missing measurement, which marks the candidate
/// incomplete. Every candidate lands in exactly one of `points`/`incomplete`.
pub fn to_points(selected: &[MetricSelection], candidates: &[Candidate]) -> PointSet {
    let mut set = PointSet::default();

    for (idx, candidate) in candidates.iter().enumerate() {
        let values: Option<Vec<f64>> = selected
            .iter()
            .map(|metric| candidate.measure(&metric.id))
            .collect();

        let Some(values) = values else {
            set.incomplete.push(idx);
            continue;
        };

        let point = Point(values);
        set.lookup.entry(point.key()).or_default().push(idx);
        set.points.push(point);
    }

    debug!(
        points = set.points.len(),
        incomplete = set.incomplete.len(),
        distinct = set.lookup.len(),
        "Built points from candidates"
    );

    set
}
