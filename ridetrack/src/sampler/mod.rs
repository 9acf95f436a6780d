//! Location sources.
//!
//! A [`GeoSampler`] produces [`GeoFix`]es either one at a time
//! ([`GeoSampler::current_position`]) or continuously through a [`Watch`].
//! Lifecycle events (`Detecting`, `Found`, `Error`) are published on a
//! broadcast channel for anyone who wants to show sensor status.
//!
//! # Implementations
//!
//! - [`GpsdSampler`] - live fixes from a `gpsd` daemon
//! - [`ReplaySampler`] - a recorded track played back with its original timing
//!
//! The implementation is chosen when the sampler is constructed; consumers
//! are generic over the trait.

mod error;
mod gpsd;
mod profile;
mod replay;
mod watch;

pub use error::{SamplerError, SamplerErrorKind};
pub use gpsd::GpsdSampler;
pub use profile::{ProfileKind, SamplingProfile};
pub use replay::ReplaySampler;
pub use watch::{Watch, WatchFeed, WatchUpdate};

use std::future::Future;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::position::GeoFix;

/// Capacity of each sampler's event channel.
pub(crate) const EVENT_CAPACITY: usize = 64;

/// Sensor lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplerEvent {
    /// A request or watch began waiting for a fix.
    Detecting,
    /// A fix was produced.
    Found(GeoFix),
    /// The source reported an error.
    Error(SamplerErrorKind),
}

/// A source of position fixes.
pub trait GeoSampler: Send + Sync + 'static {
    /// Check that the source may be used at all.
    ///
    /// Returns `PermissionDenied` or `Unsupported` when tracking cannot work.
    fn check_permission(&self) -> impl Future<Output = Result<(), SamplerError>> + Send;

    /// Obtain a single fix under the given profile.
    fn current_position(
        &self,
        profile: SamplingProfile,
    ) -> impl Future<Output = Result<GeoFix, SamplerError>> + Send;

    /// Start delivering fixes continuously until the returned handle is stopped.
    fn watch(&self, profile: SamplingProfile) -> Watch;

    /// Subscribe to lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<SamplerEvent>;
}

/// Last fix seen by a sampler, for answering requests within `maximum_age`.
#[derive(Default)]
pub(crate) struct FixCache {
    last: Mutex<Option<(GeoFix, Instant)>>,
}

impl FixCache {
    pub(crate) fn store(&self, fix: &GeoFix) {
        *self.last.lock() = Some((fix.clone(), Instant::now()));
    }

    /// Cached fix if it is younger than `maximum_age`. A zero age never hits.
    pub(crate) fn fresh(&self, maximum_age: Duration) -> Option<GeoFix> {
        if maximum_age.is_zero() {
            return None;
        }
        self.last
            .lock()
            .as_ref()
            .filter(|(_, at)| at.elapsed() <= maximum_age)
            .map(|(fix, _)| fix.clone())
    }
}

/// Publish an event, ignoring the no-subscriber case.
pub(crate) fn publish(events: &broadcast::Sender<SamplerEvent>, event: SamplerEvent) {
    let _ = events.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_cache_disabled_for_zero_age() {
        let cache = FixCache::default();
        cache.store(&GeoFix::new(1.0, 2.0, 5.0, Utc::now()));
        assert!(cache.fresh(Duration::ZERO).is_none());
    }

    #[test]
    fn test_cache_hit_within_age() {
        let cache = FixCache::default();
        assert!(cache.fresh(Duration::from_secs(5)).is_none());

        cache.store(&GeoFix::new(1.0, 2.0, 5.0, Utc::now()));
        let fix = cache.fresh(Duration::from_secs(5)).unwrap();
        assert_eq!(fix.coordinates(), (1.0, 2.0));
    }

    #[test]
    fn test_cache_expires() {
        let cache = FixCache::default();
        cache.store(&GeoFix::new(1.0, 2.0, 5.0, Utc::now()));
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.fresh(Duration::from_millis(5)).is_none());
    }
}
