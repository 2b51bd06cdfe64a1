//! # Geometry
//!
//! Pure spherical-astronomy helpers used by the catalog query engine.
//!
//! - [`bounding_box`]: axis-aligned pre-filter box around a beam
//! - [`angular_distance`]: great-circle separation
//! - [`priority`]: two-tier triage score
//! - [`coords`]: sexagesimal coordinate parsing
//!
//! All angles are radians unless a function name says otherwise.

pub mod coords;
mod scoring;
mod sphere;

pub use coords::{parse_declination, parse_right_ascension, parse_target_coordinates, CoordinateError};
pub use scoring::{priority, PRIORITY_OBSERVED, PRIORITY_UNOBSERVED};
pub use sphere::{angular_distance, bounding_box, BoundingBox};
