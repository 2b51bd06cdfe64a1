//! Bounding box and great-circle distance on the celestial sphere
//!
//! Reference: J. P. Matuschek, "Finding Points Within a Distance of a
//! Latitude/Longitude Using Bounding Coordinates".

use std::f64::consts::{FRAC_PI_2, TAU};

use contracts::SkyRegion;

/// Axis-aligned box on the sphere (radians)
///
/// `ra_min`/`ra_max` are not wrapped: for a beam near RA 0 they may fall
/// below 0 or above 2π. Use [`BoundingBox::to_region`] for the store query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub ra_min: f64,
    pub ra_max: f64,
    pub dec_min: f64,
    pub dec_max: f64,
}

impl BoundingBox {
    /// Whether the box spans every right ascension
    pub fn covers_full_ra(&self) -> bool {
        self.ra_max - self.ra_min >= TAU
    }

    /// Check whether a point (rad) falls inside the box, honouring RA wrap
    pub fn contains(&self, ra: f64, dec: f64) -> bool {
        if dec < self.dec_min || dec > self.dec_max {
            return false;
        }
        if self.covers_full_ra() {
            return true;
        }
        let offset = (ra - self.ra_min).rem_euclid(TAU);
        offset <= self.ra_max - self.ra_min
    }

    /// Convert to a degree range predicate, splitting at RA 0/360
    pub fn to_region(&self) -> SkyRegion {
        let dec_min = self.dec_min.to_degrees();
        let dec_max = self.dec_max.to_degrees();

        if self.covers_full_ra() {
            return SkyRegion {
                ra_ranges: vec![(0.0, 360.0)],
                dec_min,
                dec_max,
            };
        }

        let width = (self.ra_max - self.ra_min).to_degrees();
        let lo = self.ra_min.to_degrees().rem_euclid(360.0);
        let hi = lo + width;

        let ra_ranges = if hi <= 360.0 {
            vec![(lo, hi)]
        } else {
            vec![(lo, 360.0), (0.0, hi - 360.0)]
        };

        SkyRegion {
            ra_ranges,
            dec_min,
            dec_max,
        }
    }
}

/// Compute the pre-filter box around a beam
///
/// A beam that reaches either pole covers every right ascension. Otherwise the
/// RA half-width is `asin(sin(r) / cos(dec))` and the Dec half-width is `r`.
pub fn bounding_box(center_ra: f64, center_dec: f64, beam_radius: f64) -> BoundingBox {
    let full_ra = |dec_min: f64, dec_max: f64| BoundingBox {
        ra_min: 0.0,
        ra_max: TAU,
        dec_min,
        dec_max,
    };

    if center_dec - beam_radius <= -FRAC_PI_2 {
        return full_ra(-FRAC_PI_2, center_dec + beam_radius);
    }
    if center_dec + beam_radius >= FRAC_PI_2 {
        return full_ra(center_dec - beam_radius, FRAC_PI_2);
    }

    let ratio = beam_radius.sin() / center_dec.cos();
    if ratio >= 1.0 {
        // beam wider than the parallel circle
        return full_ra(center_dec - beam_radius, center_dec + beam_radius);
    }

    let ra_offset = ratio.asin();
    BoundingBox {
        ra_min: center_ra - ra_offset,
        ra_max: center_ra + ra_offset,
        dec_min: center_dec - beam_radius,
        dec_max: center_dec + beam_radius,
    }
}

/// Great-circle separation between two points (spherical law of cosines)
pub fn angular_distance(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    if ra1 == ra2 && dec1 == dec2 {
        return 0.0;
    }
    let cos_sep = dec1.sin() * dec2.sin() + dec1.cos() * dec2.cos() * (ra1 - ra2).cos();
    cos_sep.clamp(-1.0, 1.0).acos()
}
