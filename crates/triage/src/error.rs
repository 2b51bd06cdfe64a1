//! Triage error types

use contracts::ContractError;
use thiserror::Error;

/// Catalog query engine errors
#[derive(Debug, Error)]
pub enum TriageError {
    /// Catalog store unreachable, failed or timed out
    #[error("catalog store unavailable during {operation}: {message}")]
    StoreUnavailable {
        operation: &'static str,
        message: String,
    },

    /// Observation log batch refused by the store
    #[error("observation log write rejected: {message}")]
    WriteRejected { message: String },

    /// Observation window ends before it starts
    #[error("invalid observation window: end {end} precedes start {start}")]
    InvalidWindow { start: String, end: String },
}

impl TriageError {
    /// Map a store-level contract error for the given operation
    pub fn from_store(operation: &'static str, err: ContractError) -> Self {
        match err {
            ContractError::WriteRejected { message } => Self::WriteRejected { message },
            ContractError::StoreUnavailable { message } => {
                Self::StoreUnavailable { operation, message }
            }
            other => Self::StoreUnavailable {
                operation,
                message: other.to_string(),
            },
        }
    }

    /// Whether the store could not be reached
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TriageError>;
