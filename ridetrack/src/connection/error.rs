//! Error types for the persistent channel.

use thiserror::Error;

/// Errors returned by [`ConnectionHandle`](super::ConnectionHandle) operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// The channel is not in the `Connected` state.
    #[error("Channel is not connected")]
    NotConnected,

    /// The supervisor task has exited.
    #[error("Connection supervisor stopped")]
    Stopped,
}
