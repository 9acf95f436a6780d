//! Distance/time sample filter.
//!
//! A sample is accepted when it is the first of the session, or when it was
//! captured no earlier than the last accepted sample and either moved at
//! least `distance_filter_m` from it or arrived `min_interval` after it.

use std::time::Duration;

use crate::geo::distance_m;
use crate::position::PositionSample;

/// Why a sample was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    First,
    Moved,
    IntervalElapsed,
    OutOfOrder,
    TooClose,
}

impl FilterDecision {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::First | Self::Moved | Self::IntervalElapsed)
    }
}

#[derive(Debug, Clone)]
pub struct SampleFilter {
    distance_filter_m: f64,
    min_interval: Duration,
    last: Option<PositionSample>,
}

impl SampleFilter {
    pub fn new(distance_filter_m: f64, min_interval: Duration) -> Self {
        Self {
            distance_filter_m,
            min_interval,
            last: None,
        }
    }

    /// Classify a sample against the last accepted one without recording it.
    pub fn check(&self, sample: &PositionSample) -> FilterDecision {
        let Some(last) = &self.last else {
            return FilterDecision::First;
        };

        // Negative elapsed time fails the conversion.
        let Ok(elapsed) = (sample.captured_at - last.captured_at).to_std() else {
            return FilterDecision::OutOfOrder;
        };

        if distance_m(last.coordinates(), sample.coordinates()) >= self.distance_filter_m {
            FilterDecision::Moved
        } else if elapsed >= self.min_interval {
            FilterDecision::IntervalElapsed
        } else {
            FilterDecision::TooClose
        }
    }

    /// Classify a sample and remember it if accepted.
    pub fn offer(&mut self, sample: &PositionSample) -> FilterDecision {
        let decision = self.check(sample);
        if decision.is_accepted() {
            self.last = Some(sample.clone());
        }
        decision
    }

    pub fn last_accepted(&self) -> Option<&PositionSample> {
        self.last.as_ref()
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::offset_north;
    use crate::position::{GeoFix, RideId};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    const BASE: i64 = 1_714_564_800;

    fn sample_at(coords: (f64, f64), millis: i64) -> PositionSample {
        let at = Utc.timestamp_millis_opt(BASE * 1000 + millis).unwrap();
        GeoFix::new(coords.0, coords.1, 5.0, at).into_sample(RideId(42))
    }

    fn filter() -> SampleFilter {
        SampleFilter::new(10.0, Duration::from_secs(5))
    }

    #[test]
    fn test_ride_42_pickup_scenario() {
        let pickup = (40.7128, -74.0060);
        let mut filter = filter();

        let accepted: Vec<i64> = [
            sample_at(pickup, 0),
            sample_at(offset_north(pickup, 5.0), 2_000),
            sample_at(pickup, 11_000),
        ]
        .iter()
        .filter(|s| filter.offer(s).is_accepted())
        .map(|s| s.captured_at.timestamp() - BASE)
        .collect();

        assert_eq!(accepted, vec![0, 11]);
    }

    #[test]
    fn test_decisions() {
        let origin = (51.5, -0.12);
        let mut filter = filter();

        assert_eq!(filter.offer(&sample_at(origin, 0)), FilterDecision::First);
        assert_eq!(
            filter.offer(&sample_at(offset_north(origin, 25.0), 1_000)),
            FilterDecision::Moved
        );
        assert_eq!(
            filter.offer(&sample_at(offset_north(origin, 26.0), 2_000)),
            FilterDecision::TooClose
        );
        assert_eq!(
            filter.offer(&sample_at(offset_north(origin, 26.0), 6_000)),
            FilterDecision::IntervalElapsed
        );
    }

    #[test]
    fn test_rejects_sample_older_than_last_accepted() {
        let origin = (51.5, -0.12);
        let mut filter = filter();
        filter.offer(&sample_at(origin, 10_000));

        let far_but_old = sample_at(offset_north(origin, 500.0), 9_000);
        assert_eq!(filter.offer(&far_but_old), FilterDecision::OutOfOrder);
        assert_eq!(filter.last_accepted().unwrap().captured_at.timestamp(), BASE + 10);
    }

    #[test]
    fn test_reset_accepts_next_sample_as_first() {
        let mut filter = filter();
        filter.offer(&sample_at((0.0, 0.0), 0));
        filter.reset();
        assert_eq!(filter.check(&sample_at((0.0, 0.0), 1)), FilterDecision::First);
    }

    proptest! {
        /// Accepted samples are monotonic in time and each one either moved
        /// far enough or waited long enough relative to its predecessor.
        #[test]
        fn prop_accepted_sequence_respects_thresholds(
            steps in prop::collection::vec((-3_000i64..8_000, 0.0f64..40.0), 1..60)
        ) {
            let mut filter = filter();
            let mut coords = (48.85, 2.35);
            let mut millis = 0i64;
            let mut accepted: Vec<PositionSample> = Vec::new();

            for (dt, meters) in steps {
                millis += dt;
                coords = offset_north(coords, meters);
                let sample = sample_at(coords, millis);
                if filter.offer(&sample).is_accepted() {
                    accepted.push(sample);
                }
            }

            prop_assert!(!accepted.is_empty());
            for pair in accepted.windows(2) {
                let (prev, next) = (&pair[0], &pair[1]);
                let elapsed = (next.captured_at - prev.captured_at).num_milliseconds();
                let moved = distance_m(prev.coordinates(), next.coordinates());
                prop_assert!(elapsed >= 0);
                prop_assert!(moved >= 10.0 || elapsed >= 5_000);
            }
        }
    }
}
