//! # Session Store
//!
//! Per-subarray session state, keyed by `session_id`.
//!
//! A session is created on `configure` or lazily on the first sensor event for
//! an unknown id, mutated by sensor events, and discarded on `deconfigure`.

mod session;
mod store;

pub use session::{FieldChange, Session, SessionField};
pub use store::{SessionHandle, SessionStore};
