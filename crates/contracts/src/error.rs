//! Layered error definitions
//!
//! Categorized by source: config / message / bus / store / session

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Message Errors =====
    /// Inbound bus message could not be parsed
    #[error("malformed message '{raw}': {reason}")]
    MalformedMessage { raw: String, reason: String },

    // ===== Bus Errors =====
    /// Message bus unreachable or command failed
    #[error("message bus unavailable: {message}")]
    BusUnavailable { message: String },

    // ===== Catalog Store Errors =====
    /// Catalog store unreachable or query failed
    #[error("catalog store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Catalog store rejected an observation log write
    #[error("observation log write rejected: {message}")]
    WriteRejected { message: String },

    // ===== Session Errors =====
    /// No live session for the given identifier
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create malformed message error
    pub fn malformed(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    /// Create bus unavailable error
    pub fn bus_unavailable(message: impl Into<String>) -> Self {
        Self::BusUnavailable {
            message: message.into(),
        }
    }

    /// Create store unavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create write rejected error
    pub fn write_rejected(message: impl Into<String>) -> Self {
        Self::WriteRejected {
            message: message.into(),
        }
    }

    /// Create session not found error
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Whether this error should be treated as benign (logged at info, no action)
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::SessionNotFound { .. })
    }
}
