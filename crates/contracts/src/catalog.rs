//! Catalog rows, ranked target sets and observation log records

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Immutable reference row from the catalog store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSource {
    /// Catalog identifier
    pub source_id: i64,

    /// Right ascension (deg)
    pub ra: f64,

    /// Declination (deg)
    pub decl: f64,

    /// Owning science project
    pub project: String,
}

/// A catalog source inside the beam, with its triage priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub source_id: i64,
    pub ra: f64,
    pub decl: f64,
    pub project: String,
    /// Lower value = observe first
    pub priority: i32,
}

impl Target {
    /// Attach a priority to a catalog source
    pub fn from_source(source: CatalogSource, priority: i32) -> Self {
        Self {
            source_id: source.source_id,
            ra: source.ra,
            decl: source.decl,
            project: source.project,
            priority,
        }
    }
}

/// Query result for one pointing, sorted ascending by priority
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSet {
    pub targets: Vec<Target>,
}

impl TargetSet {
    pub fn new(targets: Vec<Target>) -> Self {
        Self { targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    /// Source identifiers in ranked order
    pub fn source_ids(&self) -> Vec<i64> {
        self.targets.iter().map(|t| t.source_id).collect()
    }
}

/// Column of a published target set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishColumn {
    SourceId,
    Ra,
    Decl,
    Project,
    Priority,
}

impl PublishColumn {
    /// Column name as it appears in the published payload
    pub fn name(&self) -> &'static str {
        match self {
            Self::SourceId => "source_id",
            Self::Ra => "ra",
            Self::Decl => "decl",
            Self::Project => "project",
            Self::Priority => "priority",
        }
    }
}

/// One row appended to the observation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationLogEntry {
    pub source_id: i64,
    /// Seconds between observation start and end
    pub duration: f64,
    pub start_time: DateTime<Utc>,
    pub mode: i32,
    pub file_id: String,
    /// Comma-joined proxy process identifiers
    pub proxies: String,
    /// Comma-joined antenna identifiers
    pub antennas: String,
    pub bands: String,
}

/// Status report sent by a processing node for one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationStatus {
    pub source_id: i64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub obs_start_time: DateTime<Utc>,
    pub success: bool,
}

/// Parse a timestamp as RFC 3339 or as a naive `YYYY-MM-DD HH:MM:SS[.f]` in UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}
