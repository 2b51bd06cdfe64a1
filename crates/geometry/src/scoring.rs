//! Two-tier triage score

use std::collections::HashSet;

/// Score for a source that has never been observed
pub const PRIORITY_UNOBSERVED: i32 = 1;

/// Score for a source already present in the observation log
pub const PRIORITY_OBSERVED: i32 = 2;

/// Triage priority of a source; lower values are observed first
pub fn priority(source_id: i64, previously_observed: &HashSet<i64>) -> i32 {
    if previously_observed.contains(&source_id) {
        PRIORITY_OBSERVED
    } else {
        PRIORITY_UNOBSERVED
    }
}
