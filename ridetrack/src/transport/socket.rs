//! Position delivery over the persistent channel.
//!
//! A batch goes out as `position` frames tagged with a fresh `batchId`. The
//! call succeeds only when the server answers `position_ack` for that batch
//! covering every position. A dropped connection or a missing ack fails the
//! call, so the batch stays Pending and the next transport gets it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, trace};

use super::{Transport, TransportError};
use crate::connection::{
    ConnectionEvent, ConnectionHandle, HandlerId, InboundMessage, LivePosition, OutboundMessage,
};
use crate::position::{PositionSample, RideId};
use crate::store::QueueItem;

/// Default wait for a `position_ack`.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

const ACK_FRAME: &str = "position_ack";

/// Sends positions as acknowledged `position` frames through a connection
/// handle.
///
/// Available only while the channel is connected. Queued actions are not
/// carried.
#[derive(Clone)]
pub struct SocketTransport {
    handle: ConnectionHandle,
    ack_timeout: Duration,
    next_batch: Arc<AtomicU64>,
}

/// Removes the ack handler when the call ends, whatever the outcome.
struct AckRegistration<'a> {
    handle: &'a ConnectionHandle,
    id: HandlerId,
}

impl Drop for AckRegistration<'_> {
    fn drop(&mut self) {
        self.handle.off(self.id);
    }
}

impl SocketTransport {
    pub fn new(handle: ConnectionHandle) -> Self {
        Self {
            handle,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            next_batch: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Register a one-shot listener for the ack of `batch_id`.
    fn expect_ack(&self, batch_id: u64) -> (AckRegistration<'_>, oneshot::Receiver<usize>) {
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));
        let id = self.handle.on(ACK_FRAME, move |frame| {
            if let InboundMessage::PositionAck {
                batch_id: acked,
                count,
            } = InboundMessage::from_frame(frame)
            {
                if acked == batch_id {
                    if let Some(tx) = slot.lock().take() {
                        let _ = tx.send(count);
                    }
                }
            }
        });
        (
            AckRegistration {
                handle: &self.handle,
                id,
            },
            rx,
        )
    }
}

/// Resolves once the channel reports a disconnect or the supervisor is gone.
async fn disconnected(events: &mut broadcast::Receiver<ConnectionEvent>) {
    loop {
        match events.recv().await {
            Ok(ConnectionEvent::Disconnected { .. }) | Err(broadcast::error::RecvError::Closed) => {
                return
            }
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
        }
    }
}

impl Transport for SocketTransport {
    fn name(&self) -> &'static str {
        "websocket"
    }

    fn is_available(&self) -> bool {
        self.handle.is_connected()
    }

    async fn send_positions(
        &self,
        ride_id: RideId,
        batch: &[PositionSample],
    ) -> Result<(), TransportError> {
        if batch.is_empty() {
            return Ok(());
        }

        let batch_id = self.next_batch.fetch_add(1, Ordering::Relaxed);
        let mut events = self.handle.subscribe();
        let (_registration, ack) = self.expect_ack(batch_id);

        for sample in batch {
            let mut position = LivePosition::from(sample);
            position.batch_id = Some(batch_id);
            self.handle
                .send(OutboundMessage::Position(position))
                .map_err(|_| TransportError::NotConnected)?;
        }
        trace!(ride_id = %ride_id, batch_id, count = batch.len(), "Batch sent, awaiting ack");

        let wait = async {
            tokio::select! {
                acked = ack => acked.map_err(|_| TransportError::NotConnected),
                _ = disconnected(&mut events) => Err(TransportError::NotConnected),
            }
        };
        let count = tokio::time::timeout(self.ack_timeout, wait)
            .await
            .map_err(|_| TransportError::Unacknowledged {
                batch_id,
                timeout: self.ack_timeout,
            })??;

        if count < batch.len() {
            return Err(TransportError::Rejected(format!(
                "server acknowledged {} of {} positions in batch {}",
                count,
                batch.len(),
                batch_id
            )));
        }
        debug!(ride_id = %ride_id, batch_id, count, "Batch acknowledged");
        Ok(())
    }

    async fn send_action(&self, item: &QueueItem) -> Result<(), TransportError> {
        Err(TransportError::Unsupported {
            transport: self.name(),
            what: format!("{} actions", item.kind),
        })
    }
}
