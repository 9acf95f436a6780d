//! Recorded-track location source.
//!
//! Plays back a track of [`GeoFix`]es stored as JSON lines, one fix per
//! line, waiting between fixes for the recorded interval divided by the
//! replay speed.
//!
//! ```text
//! {"lat":40.7128,"lng":-74.006,"accuracy":5.0,"heading":90.0,"speed":8.0,"captured_at":"2024-05-01T12:00:00Z"}
//! {"lat":40.7130,"lng":-74.006,"accuracy":5.0,"captured_at":"2024-05-01T12:00:05Z"}
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{
    publish, FixCache, GeoSampler, SamplerError, SamplerEvent, SamplingProfile, Watch, WatchFeed,
    EVENT_CAPACITY,
};
use crate::position::GeoFix;

/// Location source that replays a recorded track.
pub struct ReplaySampler {
    track: Arc<Vec<GeoFix>>,
    speed: f64,
    rebase: bool,
    events: broadcast::Sender<SamplerEvent>,
    cache: Arc<FixCache>,
}

impl ReplaySampler {
    /// Replay the given fixes at recorded speed.
    pub fn new(track: Vec<GeoFix>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            track: Arc::new(track),
            speed: 1.0,
            rebase: false,
            events,
            cache: Arc::new(FixCache::default()),
        }
    }

    /// Load a JSON-lines track. Blank lines are skipped.
    pub fn from_file(path: &Path) -> Result<Self, SamplerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SamplerError::Unavailable(format!("cannot read track {}: {}", path.display(), e))
        })?;
        let track = parse_track(&content).map_err(|(line, e)| {
            SamplerError::Unavailable(format!("{} line {}: {}", path.display(), line, e))
        })?;
        info!(path = %path.display(), fixes = track.len(), "Loaded replay track");
        Ok(Self::new(track))
    }

    /// Scale playback time. `2.0` replays twice as fast.
    pub fn with_speed(mut self, speed: f64) -> Self {
        if speed > 0.0 && speed.is_finite() {
            self.speed = speed;
        }
        self
    }

    /// Shift timestamps so the first fix of a watch is stamped "now".
    ///
    /// Relative timing is kept; only the origin moves.
    pub fn with_rebased_timestamps(mut self, rebase: bool) -> Self {
        self.rebase = rebase;
        self
    }

    pub fn len(&self) -> usize {
        self.track.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }

    fn empty_track_error() -> SamplerError {
        SamplerError::Unavailable("replay track is empty".to_string())
    }

    async fn run_watch(
        track: Arc<Vec<GeoFix>>,
        speed: f64,
        rebase: bool,
        feed: WatchFeed,
        events: broadcast::Sender<SamplerEvent>,
        cache: Arc<FixCache>,
    ) {
        publish(&events, SamplerEvent::Detecting);

        let Some(first) = track.first() else {
            let err = Self::empty_track_error();
            publish(&events, SamplerEvent::Error(err.kind()));
            feed.send(Err(err)).await;
            return;
        };
        let shift = if rebase {
            Utc::now() - first.captured_at
        } else {
            chrono::Duration::zero()
        };

        let mut previous: Option<&GeoFix> = None;
        let mut delivered = 0usize;
        for recorded in track.iter() {
            if let Some(prev) = previous {
                let gap = scaled_gap(prev, recorded, speed);
                if !gap.is_zero() {
                    tokio::select! {
                        _ = feed.stopped() => break,
                        _ = tokio::time::sleep(gap) => {}
                    }
                }
            }
            previous = Some(recorded);

            let mut fix = recorded.clone();
            fix.captured_at += shift;
            cache.store(&fix);
            publish(&events, SamplerEvent::Found(fix.clone()));
            if !feed.send(Ok(fix)).await {
                break;
            }
            delivered += 1;
        }

        debug!(delivered, total = track.len(), "Replay watch finished");
    }
}

/// Recorded gap between two fixes divided by the replay speed.
fn scaled_gap(prev: &GeoFix, next: &GeoFix, speed: f64) -> Duration {
    (next.captured_at - prev.captured_at)
        .to_std()
        .map(|gap| gap.div_f64(speed))
        .unwrap_or(Duration::ZERO)
}

/// Parse a JSON-lines track. Errors carry the 1-based line number.
fn parse_track(content: &str) -> Result<Vec<GeoFix>, (usize, serde_json::Error)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| serde_json::from_str(line).map_err(|e| (i + 1, e)))
        .collect()
}

impl GeoSampler for ReplaySampler {
    async fn check_permission(&self) -> Result<(), SamplerError> {
        Ok(())
    }

    async fn current_position(&self, profile: SamplingProfile) -> Result<GeoFix, SamplerError> {
        publish(&self.events, SamplerEvent::Detecting);

        let result = self
            .cache
            .fresh(profile.maximum_age)
            .or_else(|| self.track.first().cloned())
            .ok_or_else(Self::empty_track_error);

        match &result {
            Ok(fix) => publish(&self.events, SamplerEvent::Found(fix.clone())),
            Err(e) => publish(&self.events, SamplerEvent::Error(e.kind())),
        }
        result
    }

    fn watch(&self, _profile: SamplingProfile) -> Watch {
        let (feed, watch) = Watch::channel();
        tokio::spawn(Self::run_watch(
            Arc::clone(&self.track),
            self.speed,
            self.rebase,
            feed,
            self.events.clone(),
            Arc::clone(&self.cache),
        ));
        watch
    }

    fn subscribe(&self) -> broadcast::Receiver<SamplerEvent> {
        self.events.subscribe()
    }
}
