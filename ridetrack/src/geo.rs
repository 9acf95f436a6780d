//! Distance and speed helpers for GPS deltas.
//!
//! # Coordinate System
//!
//! - Latitude: degrees north (-90 to 90)
//! - Longitude: degrees east (-180 to 180)
//! - Distance: meters
//! - Speed: GPS sources report m/s, trip statistics use km/h

use std::f64::consts::PI;

/// Mean Earth radius in meters. The single radius used for every distance
/// computed from raw GPS fixes.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Degrees to radians conversion factor.
const DEG_TO_RAD: f64 = PI / 180.0;

/// Great-circle distance between two (lat, lng) points in meters.
///
/// # Example
///
/// ```
/// use ridetrack::geo::distance_m;
///
/// // One degree of latitude is ~111 km
/// let dist = distance_m((0.0, 0.0), (1.0, 0.0));
/// assert!((dist - 111_195.0).abs() < 10.0);
/// ```
pub fn distance_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let lat1_rad = lat1 * DEG_TO_RAD;
    let lat2_rad = lat2 * DEG_TO_RAD;
    let delta_lat = (lat2 - lat1) * DEG_TO_RAD;
    let delta_lng = (lng2 - lng1) * DEG_TO_RAD;

    // Haversine formula
    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Convert meters per second to kilometers per hour.
#[inline]
pub fn mps_to_kmh(mps: f64) -> f64 {
    mps * 3.6
}

/// Convert kilometers per hour to meters per second.
#[inline]
pub fn kmh_to_mps(kmh: f64) -> f64 {
    kmh / 3.6
}

/// Offset a point by `meters` due north. Handy for building test tracks.
pub fn offset_north(from: (f64, f64), meters: f64) -> (f64, f64) {
    let delta_lat = meters / EARTH_RADIUS_M / DEG_TO_RAD;
    (from.0 + delta_lat, from.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        assert_eq!(distance_m((48.85, 2.35), (48.85, 2.35)), 0.0);
    }

    #[test]
    fn test_known_city_distance() {
        // Paris to London is ~343 km
        let d = distance_m((48.8566, 2.3522), (51.5074, -0.1278));
        assert!((d - 343_500.0).abs() < 1_500.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = (40.4168, -3.7038);
        let b = (41.3874, 2.1686);
        assert!((distance_m(a, b) - distance_m(b, a)).abs() < 1e-6);
    }

    #[test]
    fn test_offset_north_round_trips_through_distance() {
        let start = (40.0, -3.0);
        let moved = offset_north(start, 25.0);
        assert!((distance_m(start, moved) - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_speed_conversions() {
        assert_eq!(mps_to_kmh(10.0), 36.0);
        assert!((kmh_to_mps(36.0) - 10.0).abs() < 1e-9);
    }
}
