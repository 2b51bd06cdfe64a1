//! Catalog query engine - spatial search, triage and observation log

use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use contracts::{CatalogStore, ContractError, ObservationLogEntry, PointingRequest, Target, TargetSet};
use geometry::{angular_distance, bounding_box};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, TriageError};
use crate::scorer::{HistoryPriority, PriorityScorer};

/// Default upper bound on a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Metadata of a completed observation window
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub proxies: Vec<String>,
    pub antennas: Vec<String>,
    pub file_id: String,
    pub bands: String,
    pub mode: i32,
}

impl ObservationRecord {
    /// Window length in seconds
    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// Narrows the catalog to the sources inside a beam and ranks them
///
/// The engine never retains query results; ownership of each `TargetSet`
/// passes to the caller.
#[derive(Debug)]
pub struct CatalogQueryEngine<S, P = HistoryPriority> {
    store: S,
    scorer: P,
    timeout: Duration,
}

impl<S> CatalogQueryEngine<S, HistoryPriority> {
    /// Engine with the two-tier history scorer
    pub fn new(store: S) -> Self {
        Self::with_scorer(store, HistoryPriority)
    }
}

impl<S, P> CatalogQueryEngine<S, P> {
    /// Engine with a custom scorer
    pub fn with_scorer(store: S, scorer: P) -> Self {
        Self {
            store,
            scorer,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bound every store call by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S, P> CatalogQueryEngine<S, P>
where
    S: CatalogStore + Sync,
    P: PriorityScorer,
{
    /// Sources inside the beam, sorted ascending by priority
    ///
    /// Ties keep the store's row order. Each source appears at most once.
    ///
    /// # Errors
    /// `StoreUnavailable` if either store query fails; nothing is returned
    /// partially.
    #[instrument(
        name = "engine_select_targets",
        skip(self),
        fields(ra = pointing.ra, dec = pointing.dec, beam = pointing.beam_radius)
    )]
    pub async fn select_targets(&self, pointing: &PointingRequest) -> Result<TargetSet> {
        let started = Instant::now();
        let sky_box = bounding_box(pointing.ra, pointing.dec, pointing.beam_radius);
        let region = sky_box.to_region();

        let candidates = self
            .bounded("box query", self.store.sources_in_region(&region))
            .await?;
        let candidate_count = candidates.len();

        let mut seen = HashSet::with_capacity(candidate_count);
        let inside: Vec<_> = candidates
            .into_iter()
            .filter(|source| {
                angular_distance(
                    pointing.ra,
                    pointing.dec,
                    source.ra.to_radians(),
                    source.decl.to_radians(),
                ) < pointing.beam_radius
            })
            .filter(|source| seen.insert(source.source_id))
            .collect();

        let observed = self
            .bounded("observation history", self.store.observed_source_ids())
            .await?;

        let mut targets: Vec<Target> = inside
            .into_iter()
            .map(|source| {
                let priority = self.scorer.score(&source, &observed);
                Target::from_source(source, priority)
            })
            .collect();
        targets.sort_by_key(|t| t.priority);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        observability::record_query(elapsed_ms, candidate_count, targets.len());
        debug!(
            candidates = candidate_count,
            selected = targets.len(),
            elapsed_ms = format!("{elapsed_ms:.2}"),
            "Targets selected"
        );

        Ok(TargetSet::new(targets))
    }

    /// Append one observation log entry per target
    ///
    /// Single write attempt, no retry. Returns the number of entries written.
    ///
    /// # Errors
    /// `WriteRejected` if the store refuses the batch, `StoreUnavailable` if
    /// it cannot be reached.
    #[instrument(
        name = "engine_record_observation",
        skip(self, targets, record),
        fields(targets = targets.len(), file_id = %record.file_id)
    )]
    pub async fn record_observation(
        &self,
        targets: &TargetSet,
        record: &ObservationRecord,
    ) -> Result<usize> {
        if record.end_time < record.start_time {
            return Err(TriageError::InvalidWindow {
                start: record.start_time.to_rfc3339(),
                end: record.end_time.to_rfc3339(),
            });
        }

        let proxies = record.proxies.join(",");
        let antennas = record.antennas.join(",");
        let duration = record.duration_secs();

        let entries: Vec<ObservationLogEntry> = targets
            .iter()
            .map(|target| ObservationLogEntry {
                source_id: target.source_id,
                duration,
                start_time: record.start_time,
                mode: record.mode,
                file_id: record.file_id.clone(),
                proxies: proxies.clone(),
                antennas: antennas.clone(),
                bands: record.bands.clone(),
            })
            .collect();

        if entries.is_empty() {
            info!("No targets in pointing, nothing to record");
            return Ok(0);
        }

        self.bounded("observation append", self.store.append_observations(&entries))
            .await?;

        info!(entries = entries.len(), duration, "Observation recorded");
        Ok(entries.len())
    }

    /// Set the success flag of an observation log entry
    ///
    /// A status for an unknown `(source_id, start_time)` is dropped with a log
    /// line; returns whether a row matched.
    #[instrument(name = "engine_update_observation_status", skip(self))]
    pub async fn update_observation_status(
        &self,
        source_id: i64,
        start_time: DateTime<Utc>,
        success: bool,
    ) -> Result<bool> {
        let matched = self
            .bounded(
                "observation status update",
                self.store
                    .update_observation_success(source_id, start_time, success),
            )
            .await?;

        if matched {
            debug!(source_id, success, "Observation status updated");
        } else {
            info!(
                source_id,
                start_time = %start_time,
                "No observation log entry for status update, ignoring"
            );
        }
        Ok(matched)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = std::result::Result<T, ContractError>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                observability::record_store_failure(operation);
                warn!(operation, error = %err, "Catalog store call failed");
                Err(TriageError::from_store(operation, err))
            }
            Err(_) => {
                observability::record_store_failure(operation);
                warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Catalog store call timed out"
                );
                Err(TriageError::StoreUnavailable {
                    operation,
                    message: format!("timed out after {}ms", self.timeout.as_millis()),
                })
            }
        }
    }
}
