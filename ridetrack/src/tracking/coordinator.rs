//! Tracking session lifecycle.
//!
//! The [`TrackingCoordinator`] binds a sampler watch to one ride at a time.
//! While a session is active it:
//!
//! - filters fixes with a [`SampleFilter`] in arrival order
//! - folds accepted samples into [`TripStats`] and a bounded [`History`]
//! - persists accepted samples to the [`LocalStore`]
//! - pushes the last accepted sample over the live channel every
//!   `min_update_interval` when the channel is connected
//! - flushes the store through the [`SyncEngine`] every `sync_interval`
//!
//! # Design Notes
//!
//! The session task polls cancellation first, then the watch, then the push
//! timer. In-memory session state sits behind a `parking_lot` mutex that is
//! never held across an await.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::TrackingError;
use super::eta::{estimate_eta, Eta};
use super::filter::SampleFilter;
use super::history::History;
use super::stats::TripStats;
use crate::connection::{ConnectionHandle, LivePosition, OutboundMessage};
use crate::position::{GeoFix, PositionSample, RideId};
use crate::sampler::{GeoSampler, ProfileKind, SamplerError, Watch};
use crate::store::LocalStore;
use crate::sync::{FlushReport, SyncEngine};
use crate::transport::Transport;

/// Capacity of the tracking event channel.
const EVENT_CAPACITY: usize = 256;

/// Session settings.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Minimum movement before a sample is accepted (meters).
    pub distance_filter_m: f64,
    /// Staleness window for the filter and the live push period.
    pub min_update_interval: Duration,
    pub history_length: usize,
    pub profile: ProfileKind,
    pub sync_interval: Duration,
    /// Upper bound on the flush performed by [`TrackingCoordinator::stop`].
    pub final_flush_timeout: Duration,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        use crate::config::*;

        Self {
            distance_filter_m: DEFAULT_DISTANCE_FILTER_M,
            min_update_interval: Duration::from_millis(DEFAULT_MIN_UPDATE_INTERVAL_MS),
            history_length: DEFAULT_HISTORY_LENGTH,
            profile: ProfileKind::Continuous,
            sync_interval: Duration::from_millis(DEFAULT_SYNC_INTERVAL_MS),
            final_flush_timeout: Duration::from_millis(DEFAULT_FINAL_FLUSH_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Idle,
    Tracking,
}

/// How the flush at session stop ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FinalFlush {
    Completed { batches_sent: usize, positions_synced: usize, clean: bool },
    Failed { reason: String },
    TimedOut,
}

impl From<FlushReport> for FinalFlush {
    fn from(report: FlushReport) -> Self {
        Self::Completed {
            batches_sent: report.batches_sent,
            positions_synced: report.positions_synced,
            clean: report.is_clean(),
        }
    }
}

/// What a finished session leaves behind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub ride_id: RideId,
    pub accepted: usize,
    pub rejected: usize,
    /// `None` when no sample was accepted.
    pub stats: Option<TripStats>,
    pub flush: FinalFlush,
}

#[derive(Debug, Clone)]
pub enum TrackingEvent {
    SessionStarted { ride_id: RideId },
    PositionAccepted(PositionSample),
    SensorError(SamplerError),
    /// Samples are not reaching durable storage.
    StoreDegraded { reason: String },
    /// The sampler stopped producing fixes before the session was stopped.
    WatchEnded { ride_id: RideId },
    SessionStopped(SessionSummary),
}

/// In-memory state of the active session.
struct SessionData {
    ride_id: RideId,
    filter: SampleFilter,
    history: History,
    stats: Option<TripStats>,
    accepted: usize,
    rejected: usize,
}

/// Handles to the background work of the active session.
struct Session {
    ride_id: RideId,
    watch_stop: CancellationToken,
    cancellation: CancellationToken,
    session_task: JoinHandle<()>,
    sync_task: JoinHandle<()>,
}

struct Inner<S, T: Transport> {
    sampler: S,
    store: LocalStore,
    sync: Arc<SyncEngine<T>>,
    live: Option<ConnectionHandle>,
    config: TrackingConfig,
    data: Mutex<Option<SessionData>>,
    events: broadcast::Sender<TrackingEvent>,
}

/// Owns the tracking session lifecycle: `Idle -> Tracking -> Idle`.
pub struct TrackingCoordinator<S: GeoSampler, T: Transport> {
    inner: Arc<Inner<S, T>>,
    session: tokio::sync::Mutex<Option<Session>>,
}

impl<S: GeoSampler, T: Transport> TrackingCoordinator<S, T> {
    /// Create an idle coordinator.
    ///
    /// `live` is the persistent channel used for position pushes; without
    /// one, positions only travel through the sync engine.
    pub fn new(
        sampler: S,
        store: LocalStore,
        sync: Arc<SyncEngine<T>>,
        live: Option<ConnectionHandle>,
        config: TrackingConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                sampler,
                store,
                sync,
                live,
                config,
                data: Mutex::new(None),
                events,
            }),
            session: tokio::sync::Mutex::new(None),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Start tracking `ride_id`, stopping any session already running.
    ///
    /// Fails with [`TrackingError::Sensor`] when the sampler denies
    /// permission or is unsupported.
    pub async fn start(&self, ride_id: RideId) -> Result<(), TrackingError> {
        let mut slot = self.session.lock().await;
        if let Some(previous) = slot.take() {
            info!(from = %previous.ride_id, to = %ride_id, "Switching tracked ride");
            self.finish(previous).await;
        }

        if let Err(e) = self.inner.sampler.check_permission().await {
            self.inner.publish(TrackingEvent::SensorError(e.clone()));
            if e.blocks_start() {
                warn!(ride_id = %ride_id, error = %e, "Tracking not started");
                return Err(TrackingError::Sensor(e));
            }
            debug!(error = %e, "Permission check inconclusive, starting anyway");
        }

        if !self.inner.store.is_durable() {
            self.inner.publish(TrackingEvent::StoreDegraded {
                reason: "local store is in memory, positions will not survive a restart"
                    .to_string(),
            });
        }

        let config = &self.inner.config;
        *self.inner.data.lock() = Some(SessionData {
            ride_id,
            filter: SampleFilter::new(config.distance_filter_m, config.min_update_interval),
            history: History::new(config.history_length),
            stats: None,
            accepted: 0,
            rejected: 0,
        });

        if let Some(live) = &self.inner.live {
            live.join_ride(ride_id);
        }

        let watch = self.inner.sampler.watch(config.profile.profile());
        let watch_stop = watch.stopper();
        let cancellation = CancellationToken::new();

        let session_task = tokio::spawn(run_session(
            Arc::clone(&self.inner),
            ride_id,
            watch,
            cancellation.clone(),
        ));
        let sync_task = self
            .inner
            .sync
            .spawn_periodic(config.sync_interval, cancellation.child_token());

        *slot = Some(Session {
            ride_id,
            watch_stop,
            cancellation,
            session_task,
            sync_task,
        });

        info!(
            ride_id = %ride_id,
            profile = %config.profile,
            distance_filter_m = config.distance_filter_m,
            "Tracking started"
        );
        self.inner.publish(TrackingEvent::SessionStarted { ride_id });
        Ok(())
    }

    /// Stop the active session. Returns `None` when already idle.
    pub async fn stop(&self) -> Option<SessionSummary> {
        let session = self.session.lock().await.take()?;
        Some(self.finish(session).await)
    }

    async fn finish(&self, session: Session) -> SessionSummary {
        session.watch_stop.cancel();
        session.cancellation.cancel();
        join_task(session.ride_id, "session", session.session_task).await;
        join_task(session.ride_id, "sync", session.sync_task).await;

        let flush = match tokio::time::timeout(
            self.inner.config.final_flush_timeout,
            self.inner.sync.flush(),
        )
        .await
        {
            Ok(Ok(report)) => FinalFlush::from(report),
            Ok(Err(e)) => {
                warn!(ride_id = %session.ride_id, error = %e, "Final flush failed");
                FinalFlush::Failed {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                warn!(
                    ride_id = %session.ride_id,
                    timeout_ms = self.inner.config.final_flush_timeout.as_millis() as u64,
                    "Final flush timed out"
                );
                FinalFlush::TimedOut
            }
        };

        if let Some(live) = &self.inner.live {
            live.leave_ride();
        }

        let data = self.inner.data.lock().take();
        let summary = SessionSummary {
            ride_id: session.ride_id,
            accepted: data.as_ref().map_or(0, |d| d.accepted),
            rejected: data.as_ref().map_or(0, |d| d.rejected),
            stats: data.and_then(|d| d.stats),
            flush,
        };

        info!(
            ride_id = %summary.ride_id,
            accepted = summary.accepted,
            rejected = summary.rejected,
            "Tracking stopped"
        );
        self.inner
            .publish(TrackingEvent::SessionStopped(summary.clone()));
        summary
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> TrackingState {
        if self.inner.data.lock().is_some() {
            TrackingState::Tracking
        } else {
            TrackingState::Idle
        }
    }

    pub fn active_ride(&self) -> Option<RideId> {
        self.inner.data.lock().as_ref().map(|d| d.ride_id)
    }

    pub fn trip_stats(&self) -> Option<TripStats> {
        self.inner.data.lock().as_ref().and_then(|d| d.stats.clone())
    }

    /// Accepted samples of the active session, oldest first.
    pub fn history(&self) -> Vec<PositionSample> {
        self.inner
            .data
            .lock()
            .as_ref()
            .map(|d| d.history.to_vec())
            .unwrap_or_default()
    }

    /// Advisory ETA from the last accepted sample to `destination`.
    pub fn eta_to(&self, destination: (f64, f64)) -> Result<Eta, TrackingError> {
        let data = self.inner.data.lock();
        let last = data
            .as_ref()
            .ok_or(TrackingError::NotTracking)?
            .history
            .latest()
            .ok_or(TrackingError::NotTracking)?;
        Ok(estimate_eta(last, destination, Utc::now()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackingEvent> {
        self.inner.events.subscribe()
    }
}

impl<S: GeoSampler, T: Transport> Drop for TrackingCoordinator<S, T> {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.watch_stop.cancel();
            session.cancellation.cancel();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session task
// ─────────────────────────────────────────────────────────────────────────────

async fn run_session<S: GeoSampler, T: Transport>(
    inner: Arc<Inner<S, T>>,
    ride_id: RideId,
    mut watch: Watch,
    cancellation: CancellationToken,
) {
    let period = inner.config.min_update_interval;
    let mut push = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    push.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut watching = true;

    loop {
        tokio::select! {
            biased;

            _ = cancellation.cancelled() => break,

            update = watch.next(), if watching => match update {
                Some(Ok(fix)) => inner.handle_fix(ride_id, fix),
                Some(Err(e)) => {
                    warn!(ride_id = %ride_id, error = %e, "Location sensor error");
                    inner.publish(TrackingEvent::SensorError(e));
                }
                None => {
                    info!(ride_id = %ride_id, "Location watch ended");
                    watching = false;
                    inner.publish(TrackingEvent::WatchEnded { ride_id });
                }
            },

            _ = push.tick() => inner.push_live(),
        }
    }

    watch.stop();
    debug!(ride_id = %ride_id, "Session task stopped");
}

impl<S: GeoSampler, T: Transport> Inner<S, T> {
    fn publish(&self, event: TrackingEvent) {
        let _ = self.events.send(event);
    }

    /// Filter a fix and, if accepted, record and persist it.
    fn handle_fix(&self, ride_id: RideId, fix: GeoFix) {
        let sample = fix.into_sample(ride_id);
        {
            let mut guard = self.data.lock();
            let Some(data) = guard.as_mut().filter(|d| d.ride_id == ride_id) else {
                return;
            };

            let decision = data.filter.offer(&sample);
            if !decision.is_accepted() {
                data.rejected += 1;
                debug!(ride_id = %ride_id, ?decision, "Sample filtered");
                return;
            }

            match data.stats.as_mut() {
                Some(stats) => stats.record(sample.clone()),
                None => data.stats = Some(TripStats::begin(sample.clone())),
            }
            data.history.push(sample.clone());
            data.accepted += 1;
        }

        if let Err(e) = self.store.save_position(&sample) {
            warn!(ride_id = %ride_id, error = %e, "Failed to persist position, kept in memory only");
            self.publish(TrackingEvent::StoreDegraded {
                reason: e.to_string(),
            });
        }

        self.publish(TrackingEvent::PositionAccepted(sample));
    }

    /// Send the last accepted sample over the live channel if it is up.
    fn push_live(&self) {
        let Some(live) = self.live.as_ref().filter(|l| l.is_connected()) else {
            return;
        };
        let last = self
            .data
            .lock()
            .as_ref()
            .and_then(|d| d.filter.last_accepted().cloned());

        if let Some(sample) = last {
            if let Err(e) = live.send(OutboundMessage::Position(LivePosition::from(&sample))) {
                debug!(error = %e, "Live position push skipped");
            }
        }
    }
}

/// Wait for a session task. A panic or abort is logged, not propagated.
async fn join_task(ride_id: RideId, task: &'static str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(ride_id = %ride_id, task, error = %e, "Session task ended abnormally");
            false
        }
    }
}
