//! Pareto dominance and flat non-dominated sorting.
//!
//! A point is dominated when some other point is no worse in every active
//! dimension and strictly better in at least one. Equal points never
//! dominate each other, so every non-empty pool has a non-empty front and
//! peeling always terminates.

use tracing::{debug, trace};

use crate::problem::{Objective, Partition, Point, Problem};

/// Result of splitting a pool into its non-dominated and dominated parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DominanceSplit {
    /// Points no other point dominates, in input order.
    pub non_dominated: Vec<Point>,
    /// Every remaining point, in input order.
    pub dominated: Vec<Point>,
}

/// Active dimension filter: `None` (or an empty slice) means all dimensions.
fn is_active(sub_objectives: Option<&[usize]>, dim: usize) -> bool {
    match sub_objectives {
        Some(dims) if !dims.is_empty() => dims.contains(&dim),
        _ => true,
    }
}

/// Does `other` dominate `point` over the active dimensions?
pub fn dominates(
    objectives: &[Objective],
    other: &Point,
    point: &Point,
    sub_objectives: Option<&[usize]>,
) -> bool {
    let mut point_better = false;
    let mut other_better = false;

    for (dim, ((&objective, &p), &o)) in objectives
        .iter()
        .zip(point.values())
        .zip(other.values())
        .enumerate()
    {
        if !is_active(sub_objectives, dim) {
            continue;
        }
        if objective.better(p, o) {
            point_better = true;
            break;
        }
        if objective.better(o, p) {
            other_better = true;
        }
    }

    !point_better && other_better
}

/// Split `points` into the non-dominated set and the rest.
///
/// Quadratic in the number of points. `sub_objectives` restricts the
/// comparison to those dimension indices.
pub fn non_dominated_set(
    objectives: &[Objective],
    points: &[Point],
    sub_objectives: Option<&[usize]>,
) -> DominanceSplit {
    let mut split = DominanceSplit::default();

    for (i, point) in points.iter().enumerate() {
        let dominated = points
            .iter()
            .enumerate()
            .any(|(j, other)| i != j && dominates(objectives, other, point, sub_objectives));

        if dominated {
            split.dominated.push(point.clone());
        } else {
            split.non_dominated.push(point.clone());
        }
    }

    trace!(
        non_dominated = split.non_dominated.len(),
        dominated = split.dominated.len(),
        restricted = sub_objectives.is_some_and(|dims| !dims.is_empty()),
        "Computed non-dominated set"
    );

    split
}

/// Peel successive fronts off the problem's points, best front first.
pub fn non_dominated_sorting(problem: &Problem, sub_objectives: Option<&[usize]>) -> Partition {
    let mut fronts: Partition = Vec::new();
    let mut pool = problem.points.clone();

    while !pool.is_empty() {
        let split = non_dominated_set(&problem.objectives, &pool, sub_objectives);
        debug_assert!(!split.non_dominated.is_empty());
        if split.non_dominated.is_empty() {
            // Unreachable for well-formed input; keep the remainder as one front.
            fronts.push(pool);
            break;
        }
        fronts.push(split.non_dominated);
        pool = split.dominated;
    }

    debug!(
        points = problem.points.len(),
        fronts = fronts.len(),
        "Non-dominated sorting finished"
    );

    fronts
}
