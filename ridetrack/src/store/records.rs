//! Record types persisted by the local store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::position::{RideId, SyncState};

/// Lifecycle status of a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Requested,
    Accepted,
    DriverArrived,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Accepted => "accepted",
            Self::DriverArrived => "driver_arrived",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the ride can no longer change.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "requested" => Ok(Self::Requested),
            "accepted" => Ok(Self::Accepted),
            "driver_arrived" => Ok(Self::DriverArrived),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown ride status '{}'", other)),
        }
    }
}

/// Locally cached copy of a ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
    pub id: RideId,
    pub status: RideStatus,
    /// Server representation, kept opaque.
    pub payload: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// A chat message written while offline or awaiting delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: i64,
    pub ride_id: RideId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub sync_state: SyncState,
}

/// What an outbound queue item asks the server to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Position,
    Message,
    StatusChange,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Message => "message",
            Self::StatusChange => "status_change",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "position" => Ok(Self::Position),
            "message" => Ok(Self::Message),
            "status_change" => Ok(Self::StatusChange),
            other => Err(format!("unknown action kind '{}'", other)),
        }
    }
}

/// A pending outbound action with its delivery attempt count.
///
/// Items carry their payload by value; updating one means writing a new
/// value back with [`LocalStore::update_queue_item`](super::LocalStore::update_queue_item).
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub id: i64,
    pub kind: ActionKind,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
}

impl QueueItem {
    /// Copy of this item with one more failed attempt recorded.
    pub fn with_failed_attempt(&self) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
            ..self.clone()
        }
    }
}

/// Record counts, for status displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub pending_positions: usize,
    pub synced_positions: usize,
    pub queued_actions: usize,
    pub unsynced_messages: usize,
    pub rides: usize,
}

/// Rows removed by a purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub positions: usize,
    pub messages: usize,
}

impl PurgeReport {
    pub fn total(&self) -> usize {
        self.positions + self.messages
    }
}
