//! Drains the local store to a transport.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::batch::plan_batches;
use super::queue::{queue_decision, QueueDecision};
use crate::connection::ConnectionEvent;
use crate::position::RideId;
use crate::store::{ActionKind, ChatMessage, LocalStore, QueueItem, RideStatus, StoreError};
use crate::transport::Transport;

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum positions per network call.
    pub batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
        }
    }
}

/// Outcome of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub batches_sent: usize,
    pub batches_failed: usize,
    pub positions_synced: usize,
    pub actions_delivered: usize,
    pub actions_requeued: usize,
    pub actions_dropped: usize,
}

impl FlushReport {
    /// True when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.batches_failed == 0 && self.actions_requeued == 0 && self.actions_dropped == 0
    }
}

/// Delivers pending positions and queued actions.
///
/// Flushes are serialised: a call made while another flush runs waits for
/// it to finish and then performs its own drain.
pub struct SyncEngine<T: Transport> {
    store: LocalStore,
    transport: T,
    config: SyncConfig,
    flush_lock: tokio::sync::Mutex<()>,
}

impl<T: Transport> SyncEngine<T> {
    pub fn new(store: LocalStore, transport: T, config: SyncConfig) -> Self {
        Self {
            store,
            transport,
            config,
            flush_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Drain every pending position, then the action queue.
    ///
    /// Positions go out in per-ride batches ordered by capture time. The
    /// first failed batch ends position draining for this flush; its records
    /// and all later ones stay Pending. Each queued action is tried once.
    pub async fn flush(&self) -> Result<FlushReport, StoreError> {
        let _guard = self.flush_lock.lock().await;
        let mut report = FlushReport::default();

        self.drain_positions(&mut report).await?;
        self.drain_queue(&mut report).await?;

        if report.batches_sent + report.batches_failed + report.actions_delivered > 0 {
            info!(
                transport = self.transport.name(),
                batches_sent = report.batches_sent,
                batches_failed = report.batches_failed,
                positions_synced = report.positions_synced,
                actions_delivered = report.actions_delivered,
                actions_requeued = report.actions_requeued,
                actions_dropped = report.actions_dropped,
                "Flush complete"
            );
        }
        Ok(report)
    }

    async fn drain_positions(&self, report: &mut FlushReport) -> Result<(), StoreError> {
        let pending = self.store.list_unsynced()?;
        if pending.is_empty() {
            return Ok(());
        }

        for batch in plan_batches(pending, self.config.batch_size) {
            let samples = batch.samples();
            match self.transport.send_positions(batch.ride_id, &samples).await {
                Ok(()) => {
                    report.batches_sent += 1;
                    report.positions_synced += self.store.mark_synced(&batch.local_ids())?;
                }
                Err(e) => {
                    report.batches_failed += 1;
                    debug!(
                        ride_id = %batch.ride_id,
                        size = samples.len(),
                        transport = self.transport.name(),
                        error = %e,
                        "Batch failed, remaining positions stay pending"
                    );
                    break;
                }
            }
        }
        Ok(())
    }

    async fn drain_queue(&self, report: &mut FlushReport) -> Result<(), StoreError> {
        for item in self.store.queue_items()? {
            let outcome = self.transport.send_action(&item).await;
            if let Err(e) = &outcome {
                debug!(id = item.id, kind = %item.kind, error = %e, "Action delivery failed");
            }

            match queue_decision(&item, &outcome) {
                QueueDecision::Remove => {
                    self.store.remove_queue_item(item.id)?;
                    self.on_delivered(&item)?;
                    report.actions_delivered += 1;
                }
                QueueDecision::Requeue(next) => {
                    self.store.update_queue_item(&next)?;
                    report.actions_requeued += 1;
                }
                QueueDecision::Drop(last) => {
                    warn!(
                        id = last.id,
                        kind = %last.kind,
                        attempts = last.attempts,
                        "Dropping action after repeated delivery failures"
                    );
                    self.store.remove_queue_item(last.id)?;
                    report.actions_dropped += 1;
                }
            }
        }
        Ok(())
    }

    /// Bookkeeping after an action reached the server.
    fn on_delivered(&self, item: &QueueItem) -> Result<(), StoreError> {
        if item.kind == ActionKind::Message {
            if let Some(id) = item.payload.get("message_id").and_then(|v| v.as_i64()) {
                self.store.mark_messages_synced(&[id])?;
            }
        }
        Ok(())
    }

    /// Store a chat message and queue it for delivery.
    pub fn send_message(&self, ride_id: RideId, body: &str) -> Result<ChatMessage, StoreError> {
        let message = self.store.save_message(ride_id, body)?;
        self.store.enqueue(
            ActionKind::Message,
            json!({
                "ride_id": ride_id,
                "message_id": message.id,
                "body": body,
                "timestamp": message.created_at.to_rfc3339(),
            }),
        )?;
        Ok(message)
    }

    /// Queue a ride status change, updating the cached ride if there is one.
    pub fn update_status(&self, ride_id: RideId, status: RideStatus) -> Result<QueueItem, StoreError> {
        if let Some(mut ride) = self.store.get_ride(ride_id)? {
            ride.status = status;
            ride.updated_at = Utc::now();
            self.store.save_ride(&ride)?;
        }
        self.store.enqueue(
            ActionKind::StatusChange,
            json!({"ride_id": ride_id, "status": status}),
        )
    }
}

impl<T: Transport> SyncEngine<T> {
    /// Flush every `interval` until cancelled. The first flush runs after one interval.
    pub fn spawn_periodic(
        self: &Arc<Self>,
        interval: Duration,
        cancellation: CancellationToken,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancellation.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = engine.flush().await {
                            warn!(error = %e, "Periodic flush failed");
                        }
                    }
                }
            }
            debug!("Periodic sync stopped");
        })
    }

    /// Flush whenever the channel reports `Connected`.
    pub fn spawn_reconnect_trigger(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<ConnectionEvent>,
        cancellation: CancellationToken,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancellation.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Ok(ConnectionEvent::Connected) => {
                        debug!("Channel connected, flushing");
                        if let Err(e) = engine.flush().await {
                            warn!(error = %e, "Reconnect flush failed");
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Connection events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
