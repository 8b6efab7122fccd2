//! Priority tiers of a problem.
//!
//! Objectives sharing a priority value form one tier. Tiers are visited from
//! the highest priority value down to the lowest.

use crate::error::{Result, SmoopError};
use crate::problem::Problem;

/// Unique priority values, highest first.
pub fn ranked_priorities(problem: &Problem) -> Vec<i64> {
    let mut ranked = problem.priorities.clone();
    ranked.sort_unstable_by(|a, b| b.cmp(a));
    ranked.dedup();
    ranked
}

/// The next lower priority after `current`, or the highest one when
/// `current` is `None`. Returns `None` once the lowest tier was visited.
pub fn next_priority(problem: &Problem, current: Option<i64>) -> Option<i64> {
    let ranked = ranked_priorities(problem);
    match current {
        None => ranked.first().copied(),
        Some(current) => ranked.into_iter().find(|&p| p < current),
    }
}

/// Position of `priority` among the ranked priorities.
pub fn nesting_level(problem: &Problem, priority: i64) -> Option<usize> {
    ranked_priorities(problem)
        .iter()
        .position(|&p| p == priority)
}

/// Indices of the objectives carrying exactly `priority`.
pub fn sub_objectives(problem: &Problem, priority: i64) -> Result<Vec<usize>> {
    let indices: Vec<usize> = problem
        .priorities
        .iter()
        .enumerate()
        .filter(|(_, &p)| p == priority)
        .map(|(i, _)| i)
        .collect();

    if indices.is_empty() {
        return Err(SmoopError::NoObjectivesForPriority { priority });
    }
    Ok(indices)
}
