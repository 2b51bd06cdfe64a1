//! SelectorConfig - Config Loader output
//!
//! Describes the collaborators (bus, catalog store), listener groups and triage settings.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::PublishColumn;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete target selector configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SelectorConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Message bus connection and channel names
    #[serde(default)]
    #[validate(nested)]
    pub bus: BusConfig,

    /// Catalog store connection and table names
    #[serde(default)]
    #[validate(nested)]
    pub catalog: CatalogConfig,

    /// Listener groups, one task each
    #[serde(default = "default_listeners")]
    #[validate(length(min = 1), nested)]
    pub listeners: Vec<ListenerConfig>,

    /// Beam and publishing settings
    #[serde(default)]
    #[validate(nested)]
    pub triage: TriageSettings,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            bus: BusConfig::default(),
            catalog: CatalogConfig::default(),
            listeners: default_listeners(),
            triage: TriageSettings::default(),
        }
    }
}

/// Message bus settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BusConfig {
    /// Bus URL (e.g., "redis://127.0.0.1:6379")
    #[serde(default = "default_bus_url")]
    #[validate(length(min = 1))]
    pub url: String,

    /// Channel carrying configure/deconfigure/capture alerts
    #[serde(default = "default_control_channel")]
    #[validate(length(min = 1))]
    pub control_channel: String,

    /// Channel carrying sensor updates
    #[serde(default = "default_telemetry_channel")]
    #[validate(length(min = 1))]
    pub telemetry_channel: String,

    /// Channel on which result keys are announced
    #[serde(default = "default_result_channel")]
    #[validate(length(min = 1))]
    pub result_channel: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: default_bus_url(),
            control_channel: default_control_channel(),
            telemetry_channel: default_telemetry_channel(),
            result_channel: default_result_channel(),
        }
    }
}

fn default_bus_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_control_channel() -> String {
    "alerts".to_string()
}

fn default_telemetry_channel() -> String {
    "sensor_alerts".to_string()
}

fn default_result_channel() -> String {
    "bluse:///set".to_string()
}

/// Catalog store settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CatalogConfig {
    /// Database URL
    #[serde(default = "default_catalog_url")]
    #[validate(length(min = 1))]
    pub url: String,

    /// Table holding catalog sources
    #[serde(default = "default_source_table")]
    pub source_table: String,

    /// Table holding the observation log
    #[serde(default = "default_observation_table")]
    pub observation_table: String,

    /// Connection pool size
    #[serde(default = "default_max_connections")]
    #[validate(range(min = 1))]
    pub max_connections: u32,

    /// Upper bound on a single store call
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            source_table: default_source_table(),
            observation_table: default_observation_table(),
            max_connections: default_max_connections(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_catalog_url() -> String {
    "postgres://localhost/breakthrough_db".to_string()
}

fn default_source_table() -> String {
    "target_list".to_string()
}

fn default_observation_table() -> String {
    "observation_status".to_string()
}

fn default_max_connections() -> u32 {
    4
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// One listener task and the channel patterns it subscribes to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ListenerConfig {
    /// Listener name (used in logs)
    #[validate(length(min = 1))]
    pub name: String,

    /// Channel patterns (glob)
    #[validate(length(min = 1))]
    pub patterns: Vec<String>,
}

impl ListenerConfig {
    pub fn new(name: impl Into<String>, patterns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            patterns,
        }
    }
}

/// Two listeners: control alerts and sensor alerts
pub fn default_listeners() -> Vec<ListenerConfig> {
    vec![
        ListenerConfig::new("control", vec![default_control_channel()]),
        ListenerConfig::new("telemetry", vec![default_telemetry_channel()]),
    ]
}

/// Beam, observation-log and publishing settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TriageSettings {
    /// Primary beam radius (deg)
    #[serde(default = "default_beam_radius_deg")]
    #[validate(range(exclusive_min = 0.0, max = 90.0))]
    pub beam_radius_deg: f64,

    /// Frequency band recorded in the observation log
    #[serde(default = "default_bands")]
    pub bands: String,

    /// Observing mode recorded in the observation log
    #[serde(default)]
    pub mode: i32,

    /// Ordered columns of a published target set
    #[serde(default = "default_publish_columns")]
    #[validate(length(min = 1))]
    pub publish_columns: Vec<PublishColumn>,
}

impl TriageSettings {
    /// Beam radius in radians
    pub fn beam_radius_rad(&self) -> f64 {
        self.beam_radius_deg.to_radians()
    }
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self {
            beam_radius_deg: default_beam_radius_deg(),
            bands: default_bands(),
            mode: 0,
            publish_columns: default_publish_columns(),
        }
    }
}

fn default_beam_radius_deg() -> f64 {
    0.5
}

fn default_bands() -> String {
    "L BAND".to_string()
}

fn default_publish_columns() -> Vec<PublishColumn> {
    vec![
        PublishColumn::Ra,
        PublishColumn::Decl,
        PublishColumn::Priority,
    ]
}
