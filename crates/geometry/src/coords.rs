//! Sexagesimal coordinate parsing
//!
//! Accepts `05:34:31.94`, `05 34 31.94`, `05h34m31.94s`, `+22d00m52.2s`,
//! `22°00'52.2"` and plain decimals. Right ascension is read in hours,
//! declination in degrees; both are returned in radians.

use thiserror::Error;

/// Coordinate parsing error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    /// Empty input
    #[error("empty coordinate")]
    Empty,

    /// A component could not be read as a number
    #[error("invalid coordinate '{value}'")]
    Invalid { value: String },

    /// Value outside its legal range
    #[error("{axis} out of range: {value}")]
    OutOfRange { axis: &'static str, value: f64 },

    /// Target string without two trailing coordinate components
    #[error("expected '<...>, <ra>, <dec>', got '{value}'")]
    MissingComponents { value: String },
}

/// Parse a sexagesimal or decimal quantity into its leading unit
///
/// `"-00:30:00"` -> `-0.5`
fn parse_sexagesimal(value: &str) -> Result<f64, CoordinateError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoordinateError::Empty);
    }

    let (negative, body) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let normalized: String = body
        .chars()
        .map(|c| match c {
            ':' | 'h' | 'd' | 'm' | 's' | '°' | '\'' | '"' => ' ',
            other => other,
        })
        .collect();

    let parts: Vec<&str> = normalized.split_whitespace().collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(CoordinateError::Invalid {
            value: value.to_string(),
        });
    }

    let mut total = 0.0;
    let mut scale = 1.0;
    for part in parts {
        let number: f64 = part.parse().map_err(|_| CoordinateError::Invalid {
            value: value.to_string(),
        })?;
        if number < 0.0 {
            return Err(CoordinateError::Invalid {
                value: value.to_string(),
            });
        }
        total += number / scale;
        scale *= 60.0;
    }

    Ok(if negative { -total } else { total })
}

/// Parse right ascension given in hour-angle units
pub fn parse_right_ascension(value: &str) -> Result<f64, CoordinateError> {
    let hours = parse_sexagesimal(value)?;
    if !(0.0..24.0).contains(&hours) {
        return Err(CoordinateError::OutOfRange {
            axis: "right ascension",
            value: hours,
        });
    }
    Ok((hours * 15.0).to_radians())
}

/// Parse declination given in degrees
pub fn parse_declination(value: &str) -> Result<f64, CoordinateError> {
    let degrees = parse_sexagesimal(value)?;
    if !(-90.0..=90.0).contains(&degrees) {
        return Err(CoordinateError::OutOfRange {
            axis: "declination",
            value: degrees,
        });
    }
    Ok(degrees.to_radians())
}

/// Parse a target description whose last two comma-separated components
/// are right ascension (hours) and declination (degrees)
///
/// `"Crab, radec, 5:34:31.94, 22:00:52.2"` -> `(ra, dec)` in radians
pub fn parse_target_coordinates(value: &str) -> Result<(f64, f64), CoordinateError> {
    let components: Vec<&str> = value.split(',').map(str::trim).collect();
    if components.len() < 2 {
        return Err(CoordinateError::MissingComponents {
            value: value.to_string(),
        });
    }
    let n = components.len();
    let ra = parse_right_ascension(components[n - 2])?;
    let dec = parse_declination(components[n - 1])?;
    Ok((ra, dec))
}
