//! Pluggable priority scoring

use std::collections::HashSet;

use contracts::CatalogSource;

/// Assigns an observing priority to a candidate source
///
/// Lower values sort first. Implementations must be pure: the same source and
/// history always give the same score.
pub trait PriorityScorer: Send + Sync {
    fn score(&self, source: &CatalogSource, observed: &HashSet<i64>) -> i32;
}

/// Never-observed sources first (1), previously observed after (2)
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryPriority;

impl PriorityScorer for HistoryPriority {
    fn score(&self, source: &CatalogSource, observed: &HashSet<i64>) -> i32 {
        geometry::priority(source.source_id, observed)
    }
}
