//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Message bus could not be reached
    #[error("Failed to connect to message bus at {url}: {source}")]
    BusConnection {
        url: String,
        #[source]
        source: ContractError,
    },

    /// Catalog database could not be reached
    #[error("Failed to connect to catalog store: {source}")]
    CatalogConnection {
        #[source]
        source: ContractError,
    },

    /// Coordinate argument could not be parsed
    #[error("Invalid coordinate '{value}': {message}")]
    InvalidCoordinate { value: String, message: String },

    /// Beam radius argument out of range
    #[error("Beam radius must be in (0, 90] degrees, got {0}")]
    InvalidRadius(f64),

    /// One or more listeners stopped with an error
    #[error("{count} listener(s) failed")]
    ListenersFailed { count: usize },

    /// Binary built without the Redis/PostgreSQL backends
    #[error("Built without the `live` feature; use --dry-run")]
    LiveBackendsDisabled,
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn bus_connection(url: impl Into<String>, source: ContractError) -> Self {
        Self::BusConnection {
            url: url.into(),
            source,
        }
    }

    pub fn catalog_connection(source: ContractError) -> Self {
        Self::CatalogConnection { source }
    }

    pub fn invalid_coordinate(value: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidCoordinate {
            value: value.into(),
            message: message.to_string(),
        }
    }
}
