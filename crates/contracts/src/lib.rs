//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the target selector.
//! All business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Units
//! - Pointing requests are expressed in radians.
//! - Catalog rows (`ra`, `decl`) and store range queries are expressed in degrees.

mod bus;
mod catalog;
mod config;
mod error;
mod pointing;
mod store;

pub use bus::{BusMessage, LocalMessageBus, LocalSubscription, MessageBus, Subscription};
pub use catalog::*;
pub use config::*;
pub use error::*;
pub use pointing::{PointingRequest, SkyRegion};
pub use store::{CatalogStore, LocalCatalogStore};
