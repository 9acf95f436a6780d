//! Incremental trip statistics for one session.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geo::{distance_m, mps_to_kmh};
use crate::position::PositionSample;

/// Running totals over the accepted samples of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripStats {
    pub start_time: DateTime<Utc>,
    pub total_distance_m: f64,
    pub average_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub last_position: PositionSample,
}

impl TripStats {
    /// Stats for a session whose first accepted sample is `first`.
    pub fn begin(first: PositionSample) -> Self {
        Self {
            start_time: first.captured_at,
            total_distance_m: 0.0,
            average_speed_kmh: 0.0,
            max_speed_kmh: first.speed_kmh().unwrap_or(0.0),
            last_position: first,
        }
    }

    /// Fold the next accepted sample into the totals.
    ///
    /// Max speed uses the reported speed when present, otherwise the speed
    /// implied by the segment from the previous sample.
    pub fn record(&mut self, sample: PositionSample) {
        let segment_m = distance_m(self.last_position.coordinates(), sample.coordinates());
        let segment_secs =
            (sample.captured_at - self.last_position.captured_at).num_milliseconds() as f64 / 1000.0;

        self.total_distance_m += segment_m;

        let speed_kmh = match sample.speed_kmh() {
            Some(kmh) => kmh,
            None if segment_secs > 0.0 => mps_to_kmh(segment_m / segment_secs),
            None => 0.0,
        };
        self.max_speed_kmh = self.max_speed_kmh.max(speed_kmh);

        let elapsed_secs = self.elapsed_secs(&sample);
        if elapsed_secs > 0.0 {
            self.average_speed_kmh = mps_to_kmh(self.total_distance_m / elapsed_secs);
        }

        self.last_position = sample;
    }

    /// Seconds from the session's first sample to `sample`.
    fn elapsed_secs(&self, sample: &PositionSample) -> f64 {
        (sample.captured_at - self.start_time).num_milliseconds() as f64 / 1000.0
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_m / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::offset_north;
    use crate::position::{GeoFix, RideId};
    use chrono::TimeZone;

    fn sample(coords: (f64, f64), secs: i64, speed: Option<f64>) -> PositionSample {
        let at = Utc.timestamp_opt(1_714_564_800 + secs, 0).unwrap();
        let fix = GeoFix::new(coords.0, coords.1, 5.0, at);
        let fix = match speed {
            Some(s) => fix.with_velocity(0.0, s),
            None => fix,
        };
        fix.into_sample(RideId(7))
    }

    #[test]
    fn test_begin_has_zero_distance() {
        let stats = TripStats::begin(sample((10.0, 10.0), 0, None));
        assert_eq!(stats.total_distance_m, 0.0);
        assert_eq!(stats.average_speed_kmh, 0.0);
        assert_eq!(stats.max_speed_kmh, 0.0);
    }

    #[test]
    fn test_distance_and_average_accumulate() {
        let origin = (10.0, 10.0);
        let mut stats = TripStats::begin(sample(origin, 0, None));

        // 100 m in 10 s twice: 10 m/s = 36 km/h
        stats.record(sample(offset_north(origin, 100.0), 10, None));
        stats.record(sample(offset_north(origin, 200.0), 20, None));

        assert!((stats.total_distance_m - 200.0).abs() < 0.5);
        assert!((stats.average_speed_kmh - 36.0).abs() < 0.1);
        assert!((stats.max_speed_kmh - 36.0).abs() < 0.1);
        assert_eq!(stats.last_position.captured_at.timestamp(), 1_714_564_820);
    }

    #[test]
    fn test_reported_speed_wins_for_max() {
        let origin = (10.0, 10.0);
        let mut stats = TripStats::begin(sample(origin, 0, Some(5.0)));
        assert!((stats.max_speed_kmh - 18.0).abs() < 1e-9);

        stats.record(sample(offset_north(origin, 10.0), 10, Some(15.0)));
        assert!((stats.max_speed_kmh - 54.0).abs() < 1e-9);

        stats.record(sample(offset_north(origin, 20.0), 20, Some(2.0)));
        assert!((stats.max_speed_kmh - 54.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_timestamp_does_not_divide_by_zero() {
        let origin = (10.0, 10.0);
        let mut stats = TripStats::begin(sample(origin, 0, None));
        stats.record(sample(offset_north(origin, 50.0), 0, None));

        assert!(stats.average_speed_kmh.is_finite());
        assert!(stats.max_speed_kmh.is_finite());
    }
}
