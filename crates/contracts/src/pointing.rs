//! PointingRequest - one telescope aim direction plus field of view

use serde::{Deserialize, Serialize};

/// A single telescope pointing
///
/// All angles are in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointingRequest {
    /// Right ascension of the beam centre (rad)
    pub ra: f64,

    /// Declination of the beam centre (rad)
    pub dec: f64,

    /// Angular half-width of the observable region (rad)
    pub beam_radius: f64,
}

impl PointingRequest {
    /// Create a pointing from radians
    pub fn new(ra: f64, dec: f64, beam_radius: f64) -> Self {
        Self {
            ra,
            dec,
            beam_radius,
        }
    }

    /// Create a pointing from degrees
    pub fn from_degrees(ra_deg: f64, dec_deg: f64, beam_radius_deg: f64) -> Self {
        Self::new(
            ra_deg.to_radians(),
            dec_deg.to_radians(),
            beam_radius_deg.to_radians(),
        )
    }
}

/// Range predicate handed to the catalog store
///
/// Degrees, bounds inclusive. A source matches when its `decl` lies in
/// `[dec_min, dec_max]` and its `ra` lies in any of `ra_ranges`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyRegion {
    /// Right ascension intervals (deg), each `(min, max)` with `min < max`
    pub ra_ranges: Vec<(f64, f64)>,

    /// Lower declination bound (deg)
    pub dec_min: f64,

    /// Upper declination bound (deg)
    pub dec_max: f64,
}

impl SkyRegion {
    /// Check whether a catalog position (deg) satisfies the range predicate
    pub fn contains(&self, ra_deg: f64, decl_deg: f64) -> bool {
        let dec_ok = self.dec_min <= decl_deg && decl_deg <= self.dec_max;
        dec_ok
            && self
                .ra_ranges
                .iter()
                .any(|&(lo, hi)| lo <= ra_deg && ra_deg <= hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_degrees() {
        let p = PointingRequest::from_degrees(180.0, 0.0, 0.5);
        assert!((p.ra - std::f64::consts::PI).abs() < 1e-12);
        assert!((p.beam_radius - 0.5f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_region_contains_split_ranges() {
        let region = SkyRegion {
            ra_ranges: vec![(0.0, 1.0), (359.0, 360.0)],
            dec_min: -1.0,
            dec_max: 1.0,
        };
        assert!(region.contains(0.5, 0.0));
        assert!(region.contains(359.5, 0.0));
        assert!(!region.contains(180.0, 0.0));
        assert!(!region.contains(0.5, 2.0));
    }
}
