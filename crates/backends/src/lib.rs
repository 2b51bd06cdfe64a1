//! # Backends
//!
//! Concrete `MessageBus`, `Subscription` and `CatalogStore` implementations.
//!
//! - `MemoryBus` / `MemoryCatalog`: in-process, always built, used by tests and `--dry-run`
//! - `RedisBus` / `PostgresCatalog`: live services, behind the `live` feature

mod memory_bus;
mod memory_catalog;
mod pattern;

#[cfg(feature = "live")]
mod postgres_catalog;
#[cfg(feature = "live")]
mod redis_bus;

pub use memory_bus::{MemoryBus, MemorySubscription};
pub use memory_catalog::{MemoryCatalog, StoredObservation};
pub use pattern::GlobPattern;

#[cfg(feature = "live")]
pub use postgres_catalog::PostgresCatalog;
#[cfg(feature = "live")]
pub use redis_bus::{RedisBus, RedisSubscription};
