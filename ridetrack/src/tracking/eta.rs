//! Advisory arrival estimates.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geo::{distance_m, kmh_to_mps};
use crate::position::PositionSample;

/// Reported speeds at or below this are treated as standing still.
pub const MIN_MOVING_SPEED_KMH: f64 = 5.0;

/// Speed assumed when the vehicle is not moving.
pub const DEFAULT_URBAN_SPEED_KMH: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Eta {
    pub distance_m: f64,
    /// Speed the estimate was computed with.
    pub speed_kmh: f64,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub arrival: DateTime<Utc>,
}

/// Estimate travel from `last` to `destination` (lat, lng).
///
/// Uses the reported speed when it exceeds [`MIN_MOVING_SPEED_KMH`],
/// otherwise [`DEFAULT_URBAN_SPEED_KMH`]. The distance is straight-line.
pub fn estimate_eta(last: &PositionSample, destination: (f64, f64), now: DateTime<Utc>) -> Eta {
    let speed_kmh = last
        .speed_kmh()
        .filter(|kmh| *kmh > MIN_MOVING_SPEED_KMH)
        .unwrap_or(DEFAULT_URBAN_SPEED_KMH);
    estimate_with_speed(last.coordinates(), destination, speed_kmh, now)
}

/// Estimate travel between two points at a fixed speed.
pub fn estimate_with_speed(
    from: (f64, f64),
    to: (f64, f64),
    speed_kmh: f64,
    now: DateTime<Utc>,
) -> Eta {
    let distance_m = distance_m(from, to);
    let speed_kmh = if speed_kmh > 0.0 {
        speed_kmh
    } else {
        DEFAULT_URBAN_SPEED_KMH
    };
    let duration =
        Duration::try_from_secs_f64(distance_m / kmh_to_mps(speed_kmh)).unwrap_or(Duration::MAX);
    let arrival = chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    Eta {
        distance_m,
        speed_kmh,
        duration,
        arrival,
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::offset_north;
    use crate::position::{GeoFix, RideId};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_564_800, 0).unwrap()
    }

    fn last(speed_mps: Option<f64>) -> PositionSample {
        let fix = GeoFix::new(40.0, -74.0, 5.0, now());
        match speed_mps {
            Some(s) => fix.with_velocity(90.0, s),
            None => fix,
        }
        .into_sample(RideId(42))
    }

    #[test]
    fn test_uses_urban_speed_when_slow() {
        let destination = offset_north((40.0, -74.0), 3_000.0);

        // 1 m/s = 3.6 km/h, below the moving threshold
        let eta = estimate_eta(&last(Some(1.0)), destination, now());

        assert_eq!(eta.speed_kmh, DEFAULT_URBAN_SPEED_KMH);
        // 3 km at 30 km/h = 6 minutes
        assert!((eta.duration.as_secs_f64() - 360.0).abs() < 1.0);
        let ahead = (eta.arrival - now()).num_milliseconds();
        assert!((ahead - 360_000).abs() < 1_000, "arrival {ahead} ms ahead");
    }

    #[test]
    fn test_uses_reported_speed_when_moving() {
        let destination = offset_north((40.0, -74.0), 1_000.0);

        let eta = estimate_eta(&last(Some(20.0)), destination, now());

        assert!((eta.speed_kmh - 72.0).abs() < 1e-9);
        assert!((eta.duration.as_secs_f64() - 50.0).abs() < 0.5);
    }

    #[test]
    fn test_missing_speed_falls_back() {
        let eta = estimate_eta(&last(None), (40.0, -74.0), now());
        assert_eq!(eta.distance_m, 0.0);
        assert_eq!(eta.duration, Duration::ZERO);
        assert_eq!(eta.arrival, now());
    }
}
