//! Decoding of numeric-as-text coordinate payloads
//!
//! The remote database stores coordinates as text fields
//! (`coordinates.{x,y,z}`), so decoding is a per-axis float parse with
//! the failing axis named in the error.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Coordinate payload as it appears on the wire: three numeric-as-text
/// fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCoordinates {
    pub x: String,
    pub y: String,
    pub z: String,
}

/// Parse a raw coordinate payload into a position vector.
///
/// Formatting does not matter (`"1"` and `"1.0"` parse equal); any
/// non-numeric component fails the whole triple.
pub fn parse_position(raw: &RawCoordinates) -> Result<[f32; 3], DecodeError> {
    Ok([
        parse_axis('x', &raw.x)?,
        parse_axis('y', &raw.y)?,
        parse_axis('z', &raw.z)?,
    ])
}

fn parse_axis(axis: char, text: &str) -> Result<f32, DecodeError> {
    text.trim().parse::<f32>().map_err(|_| DecodeError::BadCoordinate {
        axis,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(x: &str, y: &str, z: &str) -> RawCoordinates {
        RawCoordinates {
            x: x.to_string(),
            y: y.to_string(),
            z: z.to_string(),
        }
    }

    #[test]
    fn test_parse_valid_triple() {
        assert_eq!(parse_position(&raw("1", "2", "3")).unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(
            parse_position(&raw("-0.5", "0.25", "1e2")).unwrap(),
            [-0.5, 0.25, 100.0]
        );
    }

    #[test]
    fn test_parse_independent_of_formatting() {
        assert_eq!(
            parse_position(&raw("1.0", "2.00", " 3 ")).unwrap(),
            parse_position(&raw("1", "2", "3")).unwrap()
        );
    }

    #[test]
    fn test_parse_bad_axis_named() {
        let err = parse_position(&raw("1", "abc", "3")).unwrap_err();
        assert_eq!(
            err,
            DecodeError::BadCoordinate {
                axis: 'y',
                text: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_parse_empty_component_fails() {
        assert!(parse_position(&raw("1", "2", "")).is_err());
    }
}
