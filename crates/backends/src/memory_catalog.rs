//! In-memory catalog store with failure injection

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{CatalogSource, CatalogStore, ContractError, ObservationLogEntry, SkyRegion};
use tracing::debug;

/// Observation log row as held by the memory store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObservation {
    pub entry: ObservationLogEntry,
    /// `None` until a processing node reports back
    pub success: Option<bool>,
}

#[derive(Debug, Default)]
struct CatalogState {
    sources: Vec<CatalogSource>,
    observations: Vec<StoredObservation>,
    observed_seed: HashSet<i64>,
    query_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct CatalogInner {
    state: Mutex<CatalogState>,
    unavailable: AtomicBool,
    reject_writes: AtomicBool,
    queries: AtomicUsize,
}

/// Catalog store backed by vectors; clones share state
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    inner: Arc<CatalogInner>,
}

impl MemoryCatalog {
    /// Store with the given source table and an empty observation log
    pub fn new(sources: Vec<CatalogSource>) -> Self {
        let catalog = Self::default();
        catalog.state().sources = sources;
        catalog
    }

    /// Mark sources as already observed without adding log rows
    pub fn seed_observed(&self, ids: impl IntoIterator<Item = i64>) {
        self.state().observed_seed.extend(ids);
    }

    /// Fail every call with `StoreUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Refuse observation log writes with `WriteRejected`
    pub fn set_reject_writes(&self, reject: bool) {
        self.inner.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Delay every range query, for timeout tests
    pub fn set_query_delay(&self, delay: Option<Duration>) {
        self.state().query_delay = delay;
    }

    /// Observation log contents in insertion order
    pub fn observations(&self) -> Vec<StoredObservation> {
        self.state().observations.clone()
    }

    /// Number of range queries served
    pub fn query_count(&self) -> usize {
        self.inner.queries.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, CatalogState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), ContractError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(ContractError::store_unavailable(
                "memory catalog marked unavailable",
            ));
        }
        Ok(())
    }
}

impl CatalogStore for MemoryCatalog {
    async fn sources_in_region(
        &self,
        region: &SkyRegion,
    ) -> Result<Vec<CatalogSource>, ContractError> {
        let delay = self.state().query_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;
        self.inner.queries.fetch_add(1, Ordering::SeqCst);

        let rows: Vec<CatalogSource> = self
            .state()
            .sources
            .iter()
            .filter(|s| region.contains(s.ra, s.decl))
            .cloned()
            .collect();
        debug!(rows = rows.len(), "Region query served");
        Ok(rows)
    }

    async fn observed_source_ids(&self) -> Result<HashSet<i64>, ContractError> {
        self.check_available()?;
        let state = self.state();
        let mut ids = state.observed_seed.clone();
        ids.extend(state.observations.iter().map(|o| o.entry.source_id));
        Ok(ids)
    }

    async fn append_observations(
        &self,
        entries: &[ObservationLogEntry],
    ) -> Result<(), ContractError> {
        self.check_available()?;
        if self.inner.reject_writes.load(Ordering::SeqCst) {
            return Err(ContractError::write_rejected(
                "memory catalog refuses writes",
            ));
        }
        self.state()
            .observations
            .extend(entries.iter().cloned().map(|entry| StoredObservation {
                entry,
                success: None,
            }));
        Ok(())
    }

    async fn update_observation_success(
        &self,
        source_id: i64,
        start_time: DateTime<Utc>,
        success: bool,
    ) -> Result<bool, ContractError> {
        self.check_available()?;
        let mut matched = false;
        for row in self
            .state()
            .observations
            .iter_mut()
            .filter(|o| o.entry.source_id == source_id && o.entry.start_time == start_time)
        {
            row.success = Some(success);
            matched = true;
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: i64, ra: f64, decl: f64) -> CatalogSource {
        CatalogSource {
            source_id: id,
            ra,
            decl,
            project: "p".into(),
        }
    }

    #[tokio::test]
    async fn test_region_query_and_wrap() {
        let catalog = MemoryCatalog::new(vec![
            source(1, 359.8, 0.0),
            source(2, 0.1, 0.0),
            source(3, 180.0, 0.0),
        ]);
        let region = SkyRegion {
            ra_ranges: vec![(359.5, 360.0), (0.0, 0.5)],
            dec_min: -0.5,
            dec_max: 0.5,
        };
        let rows = catalog.sources_in_region(&region).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.source_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(catalog.query_count(), 1);
    }

    #[tokio::test]
    async fn test_observed_ids_include_seed_and_log() {
        let catalog = MemoryCatalog::new(vec![]);
        catalog.seed_observed([7]);
        catalog
            .append_observations(&[ObservationLogEntry {
                source_id: 9,
                duration: 1.0,
                start_time: Utc::now(),
                mode: 0,
                file_id: "f".into(),
                proxies: String::new(),
                antennas: String::new(),
                bands: "L BAND".into(),
            }])
            .await
            .unwrap();
        let ids = catalog.observed_source_ids().await.unwrap();
        assert_eq!(ids, HashSet::from([7, 9]));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let catalog = MemoryCatalog::new(vec![]);
        catalog.set_reject_writes(true);
        assert!(matches!(
            catalog.append_observations(&[]).await,
            Err(ContractError::WriteRejected { .. })
        ));
        catalog.set_unavailable(true);
        assert!(matches!(
            catalog.observed_source_ids().await,
            Err(ContractError::StoreUnavailable { .. })
        ));
    }
}
