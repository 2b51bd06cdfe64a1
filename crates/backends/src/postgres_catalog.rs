//! PostgreSQL catalog store
//!
//! Table names come from validated configuration and are interpolated as
//! identifiers; every value is bound.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{
    CatalogConfig, CatalogSource, CatalogStore, ContractError, ObservationLogEntry, SkyRegion,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::{debug, info, instrument};

#[derive(Debug, FromRow)]
struct SourceRow {
    source_id: i64,
    ra: f64,
    decl: f64,
    project: Option<String>,
}

impl From<SourceRow> for CatalogSource {
    fn from(row: SourceRow) -> Self {
        Self {
            source_id: row.source_id,
            ra: row.ra,
            decl: row.decl,
            project: row.project.unwrap_or_default(),
        }
    }
}

fn read_error(operation: &str, err: sqlx::Error) -> ContractError {
    ContractError::store_unavailable(format!("{operation}: {err}"))
}

fn write_error(operation: &str, err: sqlx::Error) -> ContractError {
    match err {
        sqlx::Error::Database(db) => ContractError::write_rejected(format!("{operation}: {db}")),
        other => ContractError::store_unavailable(format!("{operation}: {other}")),
    }
}

/// Catalog store over a pooled PostgreSQL connection
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
    source_table: String,
    observation_table: String,
}

impl fmt::Debug for PostgresCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresCatalog")
            .field("source_table", &self.source_table)
            .field("observation_table", &self.observation_table)
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl PostgresCatalog {
    #[instrument(name = "postgres_connect", skip(config), fields(max_connections = config.max_connections))]
    pub async fn connect(config: &CatalogConfig) -> Result<Self, ContractError> {
        info!("Connecting to catalog store");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.timeout_ms))
            .test_before_acquire(true)
            .connect(&config.url)
            .await
            .map_err(|e| read_error("connect", e))?;

        info!("Connected to catalog store");
        Ok(Self {
            pool,
            source_table: config.source_table.clone(),
            observation_table: config.observation_table.clone(),
        })
    }
}

impl CatalogStore for PostgresCatalog {
    async fn sources_in_region(
        &self,
        region: &SkyRegion,
    ) -> Result<Vec<CatalogSource>, ContractError> {
        if region.ra_ranges.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT source_id, ra, decl, project FROM {} WHERE decl >= ",
            self.source_table
        ));
        query
            .push_bind(region.dec_min)
            .push(" AND decl <= ")
            .push_bind(region.dec_max)
            .push(" AND (");
        for (i, &(lo, hi)) in region.ra_ranges.iter().enumerate() {
            if i > 0 {
                query.push(" OR ");
            }
            query
                .push("(ra >= ")
                .push_bind(lo)
                .push(" AND ra <= ")
                .push_bind(hi)
                .push(")");
        }
        query.push(")");

        let rows = query
            .build_query_as::<SourceRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| read_error("region query", e))?;

        debug!(rows = rows.len(), "Region query served");
        Ok(rows.into_iter().map(CatalogSource::from).collect())
    }

    async fn observed_source_ids(&self) -> Result<HashSet<i64>, ContractError> {
        let sql = format!("SELECT DISTINCT source_id FROM {}", self.observation_table);
        let ids: Vec<i64> = sqlx::query_scalar(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| read_error("observation history", e))?;
        Ok(ids.into_iter().collect())
    }

    async fn append_observations(
        &self,
        entries: &[ObservationLogEntry],
    ) -> Result<(), ContractError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} (source_id, duration, obs_start_time, mode, file_id, proxies, antennas, bands) ",
            self.observation_table
        ));
        query.push_values(entries, |mut row, entry| {
            row.push_bind(entry.source_id)
                .push_bind(entry.duration)
                .push_bind(entry.start_time)
                .push_bind(entry.mode)
                .push_bind(entry.file_id.clone())
                .push_bind(entry.proxies.clone())
                .push_bind(entry.antennas.clone())
                .push_bind(entry.bands.clone());
        });

        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("observation append", e))?;
        debug!(rows = result.rows_affected(), "Observation log appended");
        Ok(())
    }

    async fn update_observation_success(
        &self,
        source_id: i64,
        start_time: DateTime<Utc>,
        success: bool,
    ) -> Result<bool, ContractError> {
        let sql = format!(
            "UPDATE {} SET success = $1 WHERE source_id = $2 AND obs_start_time = $3",
            self.observation_table
        );
        let result = sqlx::query(&sql)
            .bind(success)
            .bind(source_id)
            .bind(start_time)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("observation status update", e))?;
        Ok(result.rows_affected() > 0)
    }
}
