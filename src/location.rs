//! Location - a 3-D coordinate taken from a request path
//!
//! Format: `<x>_<y>_<z>`, each component a real number.
//!
//! Examples:
//! - `0_-52_26`
//! - `-40.5_22_8`

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A point in the stereotactic space used by the coordinates relation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Parse an underscore-joined triple.
    ///
    /// Expected format: `<x>_<y>_<z>`
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split('_').collect();
        if parts.len() != 3 {
            return Err(Error::InvalidArgument(format!(
                "Coordinates '{}' must have the form x_y_z",
                raw
            )));
        }

        let component = |part: &str| -> Result<f64> {
            let value: f64 = part.trim().parse().map_err(|_| {
                Error::InvalidArgument(format!(
                    "Coordinate component '{}' in '{}' is not a number",
                    part, raw
                ))
            })?;
            if !value.is_finite() {
                return Err(Error::InvalidArgument(format!(
                    "Coordinate component '{}' in '{}' is not finite",
                    part, raw
                )));
            }
            Ok(value)
        };

        Ok(Self {
            x: component(parts[0])?,
            y: component(parts[1])?,
            z: component(parts[2])?,
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.x, self.y, self.z)
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_triple() {
        let loc = Location::parse("0_-52_26").unwrap();
        assert_eq!(loc, Location::new(0.0, -52.0, 26.0));
        assert_eq!(loc.to_string(), "0_-52_26");
    }

    #[test]
    fn test_parse_real_triple() {
        let loc: Location = "-40.5_22_8.25".parse().unwrap();
        assert_eq!(loc, Location::new(-40.5, 22.0, 8.25));
    }

    #[test]
    fn test_invalid_coordinates() {
        for raw in ["", "1_2", "1_2_3_4", "a_2_3", "1__3", "1_2_inf", "1_NaN_3"] {
            let err = Location::parse(raw).unwrap_err();
            assert!(err.is_client_error(), "{} should be rejected", raw);
        }
    }
}
