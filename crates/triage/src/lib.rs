//! # Triage
//!
//! Catalog query engine.
//!
//! Responsibilities:
//! - Two-stage spatial search: store-side box pre-filter, engine-side exact circular cut
//! - Priority assignment from observation history
//! - Observation log writes and status updates
//!
//! ```ignore
//! use triage::CatalogQueryEngine;
//!
//! let engine = CatalogQueryEngine::new(store);
//! let targets = engine.select_targets(&PointingRequest::new(ra, dec, beam)).await?;
//! ```

mod engine;
mod error;
mod scorer;

pub use engine::{CatalogQueryEngine, ObservationRecord, DEFAULT_STORE_TIMEOUT};
pub use error::{Result, TriageError};
pub use scorer::{HistoryPriority, PriorityScorer};
