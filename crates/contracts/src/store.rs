//! CatalogStore trait - source table and observation log

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::{CatalogSource, ContractError, ObservationLogEntry, SkyRegion};

/// Catalog store interface
///
/// Each call is a self-contained unit of work; no transaction spans calls.
#[trait_variant::make(CatalogStore: Send)]
pub trait LocalCatalogStore {
    /// Range query over the source table
    ///
    /// Rows are returned in the store's natural row order.
    ///
    /// # Errors
    /// `StoreUnavailable` if the store cannot be reached
    async fn sources_in_region(
        &self,
        region: &SkyRegion,
    ) -> Result<Vec<CatalogSource>, ContractError>;

    /// Distinct source identifiers already present in the observation log
    async fn observed_source_ids(&self) -> Result<HashSet<i64>, ContractError>;

    /// Append a batch of observation log entries atomically
    ///
    /// # Errors
    /// `WriteRejected` if the store refuses the batch
    async fn append_observations(
        &self,
        entries: &[ObservationLogEntry],
    ) -> Result<(), ContractError>;

    /// Set the success flag of the entry keyed by `(source_id, start_time)`
    ///
    /// Returns false if no entry matched.
    async fn update_observation_success(
        &self,
        source_id: i64,
        start_time: DateTime<Utc>,
        success: bool,
    ) -> Result<bool, ContractError>;
}
