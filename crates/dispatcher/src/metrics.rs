//! Dispatch counters for the shutdown summary

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use observability::{SelectionAggregator, SelectionSummary};

/// In-process counters shared by all listeners
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Messages handed to the dispatcher
    received: AtomicU64,
    /// Messages whose dispatch has finished, whatever the outcome
    completed: AtomicU64,
    /// Messages dropped as malformed
    malformed: AtomicU64,
    /// Messages routed to the fallback handler
    unrecognized: AtomicU64,
    /// Events whose handling failed
    failed: AtomicU64,
    /// Target sets published
    pointings: AtomicU64,
    /// Targets across all published sets
    targets: AtomicU64,
    /// Observation log rows written
    observation_rows: AtomicU64,
    selection: Mutex<SelectionAggregator>,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unrecognized(&self) {
        self.unrecognized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one published target set
    pub fn record_pointing(&self, targets: usize, latency_ms: f64) {
        self.pointings.fetch_add(1, Ordering::Relaxed);
        self.targets.fetch_add(targets as u64, Ordering::Relaxed);
        if let Ok(mut selection) = self.selection.lock() {
            selection.update(targets, latency_ms);
        }
    }

    pub fn add_observation_rows(&self, rows: usize) {
        self.observation_rows
            .fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            received: self.received.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unrecognized: self.unrecognized.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            pointings: self.pointings.load(Ordering::Relaxed),
            targets: self.targets.load(Ordering::Relaxed),
            observation_rows: self.observation_rows.load(Ordering::Relaxed),
            selection: self
                .selection
                .lock()
                .map(|s| s.summary())
                .unwrap_or_default(),
        }
    }
}

/// Point-in-time copy of `DispatchMetrics`
#[derive(Debug, Clone, Default)]
pub struct DispatchSnapshot {
    pub received: u64,
    pub completed: u64,
    pub malformed: u64,
    pub unrecognized: u64,
    pub failed: u64,
    pub pointings: u64,
    pub targets: u64,
    pub observation_rows: u64,
    pub selection: SelectionSummary,
}

impl std::fmt::Display for DispatchSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Messages received: {}", self.received)?;
        writeln!(f, "Completed: {}", self.completed)?;
        writeln!(f, "Malformed: {}", self.malformed)?;
        writeln!(f, "Unrecognized: {}", self.unrecognized)?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Pointings published: {}", self.pointings)?;
        writeln!(f, "Targets published: {}", self.targets)?;
        writeln!(f, "Observation rows: {}", self.observation_rows)?;
        write!(f, "{}", self.selection)
    }
}
