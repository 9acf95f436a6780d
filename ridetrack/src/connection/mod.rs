//! Persistent WebSocket channel to the ride server.
//!
//! - [`ConnectionSupervisor`] - connection lifecycle, heartbeat and reconnect loop
//! - [`ConnectionHandle`] - cloneable access for senders and subscribers
//! - [`ReconnectPolicy`] - pure reconnect decisions
//! - [`Frame`], [`OutboundMessage`], [`InboundMessage`] - wire format

mod backoff;
mod error;
mod frame;
mod state;
mod supervisor;

pub use backoff::{
    CloseDecision, ReconnectPolicy, ABNORMAL_CLOSURE, BACKOFF_FACTOR, NORMAL_CLOSURE,
};
pub use error::ConnectionError;
pub use frame::{Frame, InboundMessage, LivePosition, OutboundMessage};
pub use state::ConnectionState;
pub use supervisor::{
    ConnectionEvent, ConnectionHandle, ConnectionSupervisor, HandlerId, SupervisorConfig,
};
