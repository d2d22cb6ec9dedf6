//! Geographic point type.

use geo_types::{Coord, Point};
use serde::{Deserialize, Serialize};

/// A geographic position in degrees with an altitude in meters.
///
/// Serializes with the same field names the map host uses for its
/// lat/lng/altitude literals, so it can be handed to the host unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    #[serde(rename = "lat")]
    pub latitude: f64,
    /// Longitude in degrees
    #[serde(rename = "lng")]
    pub longitude: f64,
    /// Meters above the local ground plane
    #[serde(default)]
    pub altitude: f64,
}

impl GeoPoint {
    /// Creates a point on the ground plane (altitude 0).
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: 0.0,
        }
    }

    /// Returns a copy of this point with the given altitude.
    pub fn with_altitude(self, altitude: f64) -> Self {
        Self { altitude, ..self }
    }
}

impl From<Coord<f64>> for GeoPoint {
    fn from(coord: Coord<f64>) -> Self {
        Self::new(coord.y, coord.x)
    }
}

impl From<Point<f64>> for GeoPoint {
    fn from(point: Point<f64>) -> Self {
        Self::from(point.0)
    }
}

impl From<GeoPoint> for Coord<f64> {
    fn from(point: GeoPoint) -> Self {
        Coord {
            x: point.longitude,
            y: point.latitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_altitude_defaults_to_zero() {
        let point: GeoPoint = serde_json::from_str(r#"{"lat": 52.5, "lng": 13.4}"#).unwrap();

        assert_eq!(point, GeoPoint::new(52.5, 13.4));
        assert_eq!(point.altitude, 0.0);
    }

    #[test]
    fn test_serializes_host_field_names() {
        let json = serde_json::to_value(GeoPoint::new(1.0, 2.0).with_altitude(3.0)).unwrap();

        assert_eq!(json["lat"], 1.0);
        assert_eq!(json["lng"], 2.0);
        assert_eq!(json["altitude"], 3.0);
    }

    #[test]
    fn test_coord_uses_x_as_longitude() {
        let point = GeoPoint::from(Coord { x: -98.0, y: 39.0 });

        assert_eq!(point.latitude, 39.0);
        assert_eq!(point.longitude, -98.0);

        let coord: Coord<f64> = point.into();
        assert_eq!(coord, Coord { x: -98.0, y: 39.0 });
    }
}
