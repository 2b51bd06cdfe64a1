//! Ingestion error types

use contracts::ContractError;
use thiserror::Error;

/// Listener and supervisor errors
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Subscription could not be opened
    #[error("listener '{listener}' failed to subscribe: {source}")]
    Subscribe {
        listener: String,
        #[source]
        source: ContractError,
    },

    /// Receiving from the bus failed; the listener stopped
    #[error("listener '{listener}' receive failed: {source}")]
    Receive {
        listener: String,
        #[source]
        source: ContractError,
    },

    /// The bus ended the subscription while the listener was still wanted
    #[error("listener '{listener}' subscription closed unexpectedly")]
    Closed { listener: String },

    /// Listener task panicked or was aborted
    #[error("listener '{listener}' task failed: {message}")]
    TaskFailed { listener: String, message: String },
}

impl IngestionError {
    pub fn subscribe(listener: impl Into<String>, source: ContractError) -> Self {
        Self::Subscribe {
            listener: listener.into(),
            source,
        }
    }

    pub fn receive(listener: impl Into<String>, source: ContractError) -> Self {
        Self::Receive {
            listener: listener.into(),
            source,
        }
    }

    pub fn closed(listener: impl Into<String>) -> Self {
        Self::Closed {
            listener: listener.into(),
        }
    }
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
