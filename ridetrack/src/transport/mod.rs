//! Delivery of positions and queued actions to the ride server.
//!
//! The [`Transport`] trait is the seam between the sync engine and the
//! network. Implementations:
//!
//! - [`HttpTransport`] - `POST` requests against the REST API
//! - [`SocketTransport`] - acknowledged `position` frames over the persistent channel
//! - [`FallbackTransport`] - prefers one transport, falls back to another
//!
//! A typical client composes them as
//! `FallbackTransport::new(SocketTransport::new(handle), HttpTransport::new(config)?)`.

mod error;
mod fallback;
mod http;
mod socket;

#[cfg(test)]
pub(crate) mod mock;

pub use error::TransportError;
pub use fallback::FallbackTransport;
pub use http::{HttpConfig, HttpTransport};
pub use socket::{SocketTransport, DEFAULT_ACK_TIMEOUT};

use std::future::Future;
use std::sync::Arc;

use crate::position::{PositionSample, RideId};
use crate::store::QueueItem;

/// A way of delivering records to the server.
pub trait Transport: Send + Sync + 'static {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether a call is worth attempting right now.
    fn is_available(&self) -> bool;

    /// Deliver one batch of positions of a single ride, ordered by capture time.
    fn send_positions(
        &self,
        ride_id: RideId,
        batch: &[PositionSample],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Deliver one queued action.
    fn send_action(&self, item: &QueueItem)
        -> impl Future<Output = Result<(), TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn name(&self) -> &'static str {
        self.as_ref().name()
    }

    fn is_available(&self) -> bool {
        self.as_ref().is_available()
    }

    fn send_positions(
        &self,
        ride_id: RideId,
        batch: &[PositionSample],
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.as_ref().send_positions(ride_id, batch)
    }

    fn send_action(
        &self,
        item: &QueueItem,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.as_ref().send_action(item)
    }
}
