//! Observers of set splits during recursive ranking.
//!
//! Recursive rankers report every partition they compute together with the
//! recursion depth. [`SetSplitCollector`] keeps the concatenated partitions
//! per depth; the deepest one is the final set of groups the ranking could
//! not distinguish further.

use std::collections::BTreeMap;

use tracing::trace;

use crate::problem::{Partition, Problem};

/// Receives each partition computed by a recursive ranker.
pub trait SetSplitListener {
    fn on_set_split(&mut self, problem: &Problem, nesting_level: usize, partition: &Partition);
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl SetSplitListener for NoopListener {
    fn on_set_split(&mut self, _problem: &Problem, _nesting_level: usize, _partition: &Partition) {}
}

/// Groups by nesting level, in the order they were reported.
#[derive(Debug, Default, Clone)]
pub struct SetSplitCollector {
    levels: BTreeMap<usize, Partition>,
}

impl SetSplitCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups of the deepest level seen, or an empty partition.
    pub fn non_distinguishable_sets(&self) -> Partition {
        self.levels
            .last_key_value()
            .map(|(_, partition)| partition.clone())
            .unwrap_or_default()
    }

    /// Number of groups at the deepest level.
    pub fn diversity_count(&self) -> usize {
        self.levels
            .last_key_value()
            .map_or(0, |(_, partition)| partition.len())
    }

    pub fn deepest_level(&self) -> Option<usize> {
        self.levels.last_key_value().map(|(level, _)| *level)
    }

    pub fn level(&self, nesting_level: usize) -> Option<&Partition> {
        self.levels.get(&nesting_level)
    }
}

impl SetSplitListener for SetSplitCollector {
    fn on_set_split(&mut self, _problem: &Problem, nesting_level: usize, partition: &Partition) {
        trace!(nesting_level, groups = partition.len(), "Set split");
        self.levels
            .entry(nesting_level)
            .or_default()
            .extend(partition.iter().cloned());
    }
}
