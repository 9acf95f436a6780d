//! Error types for delivery transports.

use std::time::Duration;

use thiserror::Error;

/// Errors from a [`Transport`](super::Transport) call.
///
/// Every variant means the records of the call were not delivered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The server answered with a non-2xx status, `success: false` or a
    /// body without a success flag.
    #[error("Server rejected request: {0}")]
    Rejected(String),

    /// The persistent channel is not connected.
    #[error("Channel is not connected")]
    NotConnected,

    /// The channel took the frames but the server did not confirm them.
    #[error("Batch {batch_id} not acknowledged within {timeout:?}")]
    Unacknowledged { batch_id: u64, timeout: Duration },

    /// This transport cannot carry the requested kind of record.
    #[error("{transport} transport cannot deliver {what}")]
    Unsupported {
        transport: &'static str,
        what: String,
    },

    /// The record could not be encoded for the wire.
    #[error("Invalid payload: {0}")]
    Payload(String),
}
