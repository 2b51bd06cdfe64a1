//! # Ingestion
//!
//! Bus listeners for the target selector.
//!
//! Responsibilities:
//! - One long-lived task per configured subscription
//! - Hand every message, in arrival order, to the shared `MessageHandler`
//! - Cooperative shutdown through a shared `CancellationToken`
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::Supervisor;
//!
//! let mut supervisor = Supervisor::new(Arc::new(dispatcher));
//! supervisor.spawn_listener("control", bus.subscribe(&["alerts".into()]).await?);
//! supervisor.spawn_listener("telemetry", bus.subscribe(&["sensor_alerts".into()]).await?);
//!
//! let report = supervisor.run_until(shutdown_signal()).await;
//! ```

mod error;
mod handler;
mod listener;
mod supervisor;

pub use error::{IngestionError, Result};
pub use handler::MessageHandler;
pub use listener::{BusListener, ListenerStats};
pub use supervisor::{Supervisor, SupervisorReport};
