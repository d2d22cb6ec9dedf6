//! Conversion between geographic and local scene coordinates.
//!
//! Local coordinates are meters on a tangent plane centered on a reference
//! point: x points east, y points north and z is the altitude. The mapping
//! is only accurate for a local area (tens of kilometers) around the
//! reference point.
//!
//! `forward` measures each axis independently with the haversine formula,
//! while `inverse` walks a great circle along the true bearing of the local
//! vector. The two are not exact inverses of each other; the round-trip
//! error grows with the distance from the reference point.

use super::GeoPoint;
use glam::DVec3;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Converts a geographic point to local coordinates relative to `reference`.
///
/// The altitude of `point` is passed through as z. The altitude of the
/// reference point is ignored.
pub fn forward(point: &GeoPoint, reference: &GeoPoint) -> DVec3 {
    let dx = distance(
        reference,
        &GeoPoint::new(reference.latitude, point.longitude),
    );
    let dy = distance(
        reference,
        &GeoPoint::new(point.latitude, reference.longitude),
    );

    let sx = sign(point.longitude - reference.longitude);
    let sy = sign(point.latitude - reference.latitude);

    DVec3::new(sx * dx, sy * dy, point.altitude)
}

/// Converts local coordinates relative to `reference` back to a geographic point.
///
/// Only the x/y components contribute to the horizontal distance; z becomes
/// the altitude unchanged.
pub fn inverse(point: DVec3, reference: &GeoPoint) -> GeoPoint {
    let planar_distance = point.truncate().length();
    let bearing = true_bearing(point);

    destination(reference, planar_distance, bearing).with_altitude(point.z)
}

/// Great-circle distance in meters between two points (haversine formula).
pub fn distance(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();

    2.0 * a.sqrt().atan2((1.0 - a).sqrt()) * EARTH_RADIUS_METERS
}

/// Point reached when travelling `distance` meters from `origin` along the
/// great circle with the given true bearing (degrees clockwise from north).
///
/// The result lies on the ground plane; callers set the altitude.
pub fn destination(origin: &GeoPoint, distance: f64, bearing: f64) -> GeoPoint {
    let lng_origin = origin.longitude.to_radians();
    let lat_origin = origin.latitude.to_radians();

    let bearing = bearing.to_radians();
    let angular = distance / EARTH_RADIUS_METERS;

    let lat = (lat_origin.sin() * angular.cos()
        + lat_origin.cos() * angular.sin() * bearing.cos())
    .asin();
    let lng = lng_origin
        + (bearing.sin() * angular.sin() * lat_origin.cos())
            .atan2(angular.cos() - lat_origin.sin() * lat.sin());

    GeoPoint::new(lat.to_degrees(), lng.to_degrees())
}

/// True bearing (compass direction, [0, 360)) of a local vector from the origin.
pub fn true_bearing(point: DVec3) -> f64 {
    (90.0 - point.y.atan2(point.x).to_degrees()).rem_euclid(360.0)
}

/// Sign of a coordinate difference; zero stays zero.
fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn munich() -> GeoPoint {
        GeoPoint::new(48.137_154, 11.576_124)
    }

    #[test]
    fn test_reference_maps_to_origin() {
        for reference in [
            GeoPoint::new(0.0, 0.0),
            munich(),
            GeoPoint::new(-33.86, 151.21).with_altitude(120.0),
        ] {
            let local = forward(&reference, &reference);

            // Altitude passes through unchanged, even for a raised reference.
            assert_eq!(local, DVec3::new(0.0, 0.0, reference.altitude));
        }
    }

    #[test]
    fn test_one_degree_east_at_equator() {
        let reference = GeoPoint::new(0.0, 0.0);
        let point = GeoPoint::new(0.0, 1.0).with_altitude(10.0);

        let local = forward(&point, &reference);

        assert!((local.x - 111_195.0).abs() < 1_111.95, "x = {}", local.x);
        assert!(local.y.abs() < 1e-9);
        assert_eq!(local.z, 10.0);
    }

    #[test]
    fn test_axis_signs() {
        let reference = munich();
        let offset = 0.01;

        let north_east = forward(
            &GeoPoint::new(reference.latitude + offset, reference.longitude + offset),
            &reference,
        );
        assert!(north_east.x > 0.0);
        assert!(north_east.y > 0.0);

        let south_west = forward(
            &GeoPoint::new(reference.latitude - offset, reference.longitude - offset),
            &reference,
        );
        assert!(south_west.x < 0.0);
        assert!(south_west.y < 0.0);
    }

    #[test]
    fn test_zero_difference_collapses_axis() {
        let reference = munich();
        let due_north = GeoPoint::new(reference.latitude + 0.01, reference.longitude);

        let local = forward(&due_north, &reference);

        assert_eq!(local.x, 0.0);
        assert!(local.y > 1_000.0);
    }

    #[test]
    fn test_altitude_passes_through() {
        let reference = munich().with_altitude(500.0);
        let point = GeoPoint::new(48.2, 11.6).with_altitude(42.5);

        assert_eq!(forward(&point, &reference).z, 42.5);
        assert_eq!(inverse(DVec3::new(10.0, -20.0, 7.25), &reference).altitude, 7.25);
    }

    #[test]
    fn test_round_trip_near_reference() {
        let reference = munich();
        // Roughly 60 m east and 67 m north.
        let point = GeoPoint::new(reference.latitude + 0.0006, reference.longitude + 0.0008)
            .with_altitude(3.0);

        let back = inverse(forward(&point, &reference), &reference);

        // 1e-5 degrees is at most ~1.1 m.
        assert!((back.latitude - point.latitude).abs() < 1e-5);
        assert!((back.longitude - point.longitude).abs() < 1e-5);
        assert_eq!(back.altitude, 3.0);
    }

    #[test]
    fn test_round_trip_error_within_a_kilometer() {
        let reference = munich();
        let point = GeoPoint::new(reference.latitude - 0.006, reference.longitude + 0.009);

        let back = inverse(forward(&point, &reference), &reference);

        assert!(distance(&back, &point) < 1.0);
    }

    #[test]
    fn test_inverse_of_origin_is_reference() {
        let reference = munich();

        let back = inverse(DVec3::ZERO, &reference);

        assert!((back.latitude - reference.latitude).abs() < 1e-12);
        assert!((back.longitude - reference.longitude).abs() < 1e-12);
    }

    #[test]
    fn test_true_bearing_quadrants() {
        assert!((true_bearing(DVec3::new(0.0, 1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((true_bearing(DVec3::new(1.0, 0.0, 0.0)) - 90.0).abs() < 1e-9);
        assert!((true_bearing(DVec3::new(0.0, -1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((true_bearing(DVec3::new(-1.0, 0.0, 0.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_distance_is_symmetric() {
        let a = munich();
        let b = GeoPoint::new(48.3538, 11.7861);

        let ab = distance(&a, &b);

        assert!((ab - distance(&b, &a)).abs() < 1e-6);
        assert!(ab > 28_000.0 && ab < 30_000.0, "distance = {}", ab);
    }
}
