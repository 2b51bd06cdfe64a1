//! # Dispatcher
//!
//! Event dispatch and result publishing.
//!
//! Responsibilities:
//! - Classify bus messages into control, sensor and unrecognized events
//! - Drive per-session state transitions through the session store
//! - Run catalog queries for completed pointings and schedule blocks
//! - Publish each target set under `<session_id>:pointing_<n>:targets` and
//!   announce the key on the result channel

pub mod dispatcher;
pub mod error;
pub mod message;
pub mod metrics;
pub mod publisher;
pub mod schedule;

pub use dispatcher::{DispatchOutcome, DispatcherSettings, EventDispatcher};
pub use error::DispatcherError;
pub use message::{parse_event, ChannelClass, ChannelMap, ControlAction, Event, SensorKind};
pub use metrics::{DispatchMetrics, DispatchSnapshot};
pub use publisher::{targets_key, Publisher};
