//! Target selector metrics
//!
//! Free functions forward to the global `metrics` recorder; the aggregator
//! keeps an in-process summary for the end-of-run report.

use metrics::{counter, gauge, histogram};

/// Record one completed catalog query
///
/// ```ignore
/// let started = Instant::now();
/// // ... query ...
/// record_query(started.elapsed().as_secs_f64() * 1000.0, rows.len(), targets.len());
/// ```
pub fn record_query(latency_ms: f64, candidates: usize, selected: usize) {
    counter!("target_selector_queries_total").increment(1);
    histogram!("target_selector_query_latency_ms").record(latency_ms);
    histogram!("target_selector_query_candidates").record(candidates as f64);
    histogram!("target_selector_query_selected").record(selected as f64);
}

/// Record a failed or timed-out catalog store call
pub fn record_store_failure(operation: &str) {
    counter!(
        "target_selector_store_failures_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record an inbound bus event by kind
pub fn record_event(listener: &str, kind: &str) {
    counter!(
        "target_selector_events_total",
        "listener" => listener.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a message dropped as malformed
pub fn record_malformed_message(listener: &str) {
    counter!(
        "target_selector_malformed_messages_total",
        "listener" => listener.to_string()
    )
    .increment(1);
}

/// Record a target set publication
pub fn record_publish(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "target_selector_publications_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record observation log rows written
pub fn record_observations_logged(rows: usize) {
    counter!("target_selector_observation_rows_total").increment(rows as u64);
}

/// Record the number of live sessions
pub fn record_live_sessions(count: usize) {
    gauge!("target_selector_live_sessions").set(count as f64);
}

/// In-process aggregation of query results
#[derive(Debug, Clone, Default)]
pub struct SelectionAggregator {
    /// Published target sets
    pub total_publications: u64,

    /// Target sets that came back empty
    pub empty_publications: u64,

    /// Targets per publication
    pub target_stats: RunningStats,

    /// End-to-end handling latency (ms)
    pub latency_stats: RunningStats,
}

impl SelectionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one published target set
    pub fn update(&mut self, targets: usize, latency_ms: f64) {
        self.total_publications += 1;
        if targets == 0 {
            self.empty_publications += 1;
        }
        self.target_stats.push(targets as f64);
        self.latency_stats.push(latency_ms);
    }

    pub fn summary(&self) -> SelectionSummary {
        SelectionSummary {
            total_publications: self.total_publications,
            empty_publications: self.empty_publications,
            targets: StatsSummary::from(&self.target_stats),
            latency_ms: StatsSummary::from(&self.latency_stats),
        }
    }
}

/// Snapshot of a `SelectionAggregator`
#[derive(Debug, Clone, Default)]
pub struct SelectionSummary {
    pub total_publications: u64,
    pub empty_publications: u64,
    pub targets: StatsSummary,
    pub latency_ms: StatsSummary,
}

impl std::fmt::Display for SelectionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Target Selection Summary ===")?;
        writeln!(f, "Publications: {}", self.total_publications)?;
        writeln!(f, "Empty publications: {}", self.empty_publications)?;
        writeln!(f, "Targets per pointing: {}", self.targets)?;
        writeln!(f, "Handling latency (ms): {}", self.latency_ms)?;
        Ok(())
    }
}

/// min / max / mean / std of a series
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean and variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [4.0, 8.0, 6.0, 2.0] {
            stats.push(v);
        }
        assert_eq!(stats.count(), 4);
        assert!((stats.mean() - 5.0).abs() < 1e-10);
        assert!((stats.min() - 2.0).abs() < 1e-10);
        assert!((stats.max() - 8.0).abs() < 1e-10);
        assert!((stats.variance() - 20.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts_empty_sets() {
        let mut agg = SelectionAggregator::new();
        agg.update(3, 12.0);
        agg.update(0, 4.0);

        let summary = agg.summary();
        assert_eq!(summary.total_publications, 2);
        assert_eq!(summary.empty_publications, 1);
        assert_eq!(summary.targets.count, 2);
        assert!((summary.latency_ms.mean - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let summary = SelectionAggregator::new().summary();
        let output = summary.to_string();
        assert!(output.contains("Publications: 0"));
        assert!(output.contains("N/A"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_query(1.0, 10, 2);
        record_store_failure("box query");
        record_event("control", "configure");
        record_publish(true);
    }
}
