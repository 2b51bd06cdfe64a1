//! Dispatcher error types

use contracts::ContractError;
use geometry::CoordinateError;
use thiserror::Error;
use triage::TriageError;

/// Failure while handling one event
///
/// Never escapes `EventDispatcher::dispatch`; it is logged and counted there.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sensor requires a value and none was sent or stored
    #[error("no value for sensor '{sensor}'")]
    MissingValue { sensor: String },

    /// Sensor value could not be interpreted
    #[error("invalid value '{value}' for sensor '{sensor}': {reason}")]
    InvalidValue {
        sensor: String,
        value: String,
        reason: String,
    },

    /// Schedule block in none of the accepted shapes
    #[error("invalid schedule block: {message}")]
    ScheduleBlock { message: String },

    /// Target coordinates could not be parsed
    #[error("coordinates: {0}")]
    Coordinates(#[from] CoordinateError),

    /// Catalog query or observation log failure
    #[error(transparent)]
    Triage(#[from] TriageError),

    /// Bus failure or malformed message
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl DispatcherError {
    pub fn missing_value(sensor: impl Into<String>) -> Self {
        Self::MissingValue {
            sensor: sensor.into(),
        }
    }

    pub fn invalid_value(
        sensor: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            sensor: sensor.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn schedule_block(message: impl Into<String>) -> Self {
        Self::ScheduleBlock {
            message: message.into(),
        }
    }

    /// Whether the catalog store could not be reached
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Triage(e) if e.is_store_unavailable())
    }
}

pub type Result<T> = std::result::Result<T, DispatcherError>;
