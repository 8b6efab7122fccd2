//! Composite rankers built on dominance and scalarization.
//!
//! - HDS: flat non-dominated sorting first, then every front is refined tier
//!   by tier using only the objectives of that priority.
//! - RP-HDS: HDS, with the final indistinguishable groups ordered by distance
//!   to the ideal vector.
//! - LRR: single-objective peeling; ties on the current tier are broken by
//!   the next tier only.
//! - NDS variants that order each front by weighted sum or by a trailing
//!   high-level objective.
//!
//! Recursive rankers report each partition to a [`SetSplitListener`].

use std::cmp::Ordering;

use tracing::debug;

use crate::collector::{SetSplitCollector, SetSplitListener};
use crate::dominance::non_dominated_sorting;
use crate::error::{Result, SmoopError};
use crate::priority::{nesting_level, next_priority, sub_objectives};
use crate::problem::{Partition, Point, Problem};
use crate::scalarize::{flatten, single, to_p, weighted_sum, ReferenceFrame, WeightedSumMethod};

/// Minimum objective count of [`non_dominated_sorting_hl`].
pub const MIN_HIGH_LEVEL_OBJECTIVES: usize = 3;

// =============================================================================
// Hybrid non-dominated sorting
// =============================================================================

/// Hybrid non-dominated sorting over prioritized objectives.
///
/// Returns one slot per top-level front; each slot holds the front's points
/// in their refined order. The finest groups are reported to `listener`.
pub fn hybrid_non_dominated_sorting(
    problem: &Problem,
    listener: &mut dyn SetSplitListener,
) -> Result<Partition> {
    hds_pass(problem, listener, None)
}

fn hds_pass(
    problem: &Problem,
    listener: &mut dyn SetSplitListener,
    current: Option<i64>,
) -> Result<Partition> {
    let restriction = current
        .map(|priority| sub_objectives(problem, priority))
        .transpose()?;

    let mut fronts = non_dominated_sorting(problem, restriction.as_deref());

    // Level 0 is the priority-free pass; tiers follow in descending priority.
    let level = match current {
        None => 0,
        Some(priority) => nesting_level(problem, priority).map_or(0, |l| l + 1),
    };
    listener.on_set_split(problem, level, &fronts);

    let Some(next) = next_priority(problem, current) else {
        return Ok(fronts);
    };

    debug!(
        priority = ?current,
        next,
        fronts = fronts.len(),
        "Refining fronts with next priority"
    );

    for front in fronts.iter_mut() {
        let sub = problem.subproblem(std::mem::take(front));
        *front = hds_pass(&sub, listener, Some(next))?
            .into_iter()
            .flatten()
            .collect();
    }

    Ok(fronts)
}

/// HDS whose indistinguishable groups are ordered by reference-point distance.
///
/// The returned partition is the collector's deepest level with each group
/// sorted ascending by distance to the ideal vector of all points.
pub fn reference_point_hds(
    problem: &Problem,
    collector: &mut SetSplitCollector,
) -> Result<Partition> {
    hybrid_non_dominated_sorting(problem, collector)?;
    let frame = ReferenceFrame::new(&problem.objectives, &problem.points);
    Ok(order_groups_by_distance(
        &frame,
        collector.non_distinguishable_sets(),
    ))
}

/// Stable-sort every group ascending by distance to the frame's ideal.
pub fn order_groups_by_distance(frame: &ReferenceFrame, groups: Partition) -> Partition {
    groups
        .into_iter()
        .map(|group| {
            let mut keyed: Vec<(f64, Point)> = group
                .into_iter()
                .map(|point| (frame.distance(&point), point))
                .collect();
            keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            keyed.into_iter().map(|(_, point)| point).collect()
        })
        .collect()
}

// =============================================================================
// Linear recursive ranking
// =============================================================================

/// Linear recursive ranking (naive dominated sorting).
///
/// Sorts on the first objective of the highest tier, groups equal values
/// and refines each group with the next tier. Fails when the problem has no
/// priorities.
pub fn linear_recursive_ranking(
    problem: &Problem,
    listener: &mut dyn SetSplitListener,
) -> Result<Partition> {
    lrr_pass(problem, listener, None)
}

fn lrr_pass(
    problem: &Problem,
    listener: &mut dyn SetSplitListener,
    last: Option<i64>,
) -> Result<Partition> {
    let Some(priority) = next_priority(problem, last) else {
        return Err(SmoopError::EmptySelection);
    };

    // Only the first objective of a tier is used as the criterion.
    let dim = sub_objectives(problem, priority)?[0];
    let sorted = single(&problem.objectives, &problem.points, Some(dim));
    let mut groups = to_p(&sorted, Some(dim));

    let level = nesting_level(problem, priority).unwrap_or(0);
    listener.on_set_split(problem, level, &groups);

    if next_priority(problem, Some(priority)).is_some() {
        for group in groups.iter_mut() {
            let sub = problem.subproblem(std::mem::take(group));
            *group = lrr_pass(&sub, listener, Some(priority))?
                .into_iter()
                .flatten()
                .collect();
        }
    }

    Ok(groups)
}

// =============================================================================
// NDS with sub-ranking
// =============================================================================

/// Non-dominated sorting with every multi-point front ordered by weighted sum.
pub fn non_dominated_sorting_ws(
    problem: &Problem,
    method: WeightedSumMethod,
    weight_sum_tolerance: f64,
) -> Result<Partition> {
    let mut fronts = non_dominated_sorting(problem, None);

    for front in fronts.iter_mut().filter(|front| front.len() > 1) {
        let sub = problem.subproblem(std::mem::take(front));
        *front = weighted_sum(&sub, method, weight_sum_tolerance)?.sorted_points;
    }

    Ok(fronts)
}

/// Non-dominated sorting over all but the last objective; each front is then
/// ordered by the last ("high-level") objective alone.
pub fn non_dominated_sorting_hl(problem: &Problem) -> Result<Partition> {
    let dims = problem.objectives.len();
    if dims < MIN_HIGH_LEVEL_OBJECTIVES {
        return Err(SmoopError::TooFewObjectives {
            required: MIN_HIGH_LEVEL_OBJECTIVES,
            actual: dims,
        });
    }

    let high_level = dims - 1;
    let lower: Vec<usize> = (0..high_level).collect();

    Ok(non_dominated_sorting(problem, Some(&lower))
        .into_iter()
        .map(|front| single(&problem.objectives, &front, Some(high_level)))
        .collect())
}

/// Concatenate a partition and check that no point was lost or invented.
pub fn flatten_checked(strategy: &str, partition: &Partition, expected: usize) -> Result<Vec<Point>> {
    let sorted = flatten(partition);
    if sorted.len() != expected {
        return Err(SmoopError::InvariantViolation {
            strategy: strategy.to_string(),
            actual: sorted.len(),
            expected,
        });
    }
    Ok(sorted)
}
