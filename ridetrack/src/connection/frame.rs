//! Wire format of the persistent channel.
//!
//! Every message in either direction is a JSON envelope:
//!
//! ```text
//! {"type": "join_ride", "data": {"rideId": 42}, "timestamp": 1714564800000}
//! ```
//!
//! `timestamp` is Unix milliseconds at send time. Payload keys are camelCase.
//!
//! Positions sent as part of a durable batch carry a `batchId`. The server
//! confirms the batch with `position_ack {batchId, count}` once it has stored
//! `count` positions of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::position::{PositionSample, RideId};
use crate::store::RideStatus;

/// Envelope of every channel message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub timestamp: i64,
}

impl Frame {
    pub fn new(kind: impl Into<String>, data: serde_json::Value, at: DateTime<Utc>) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: at.timestamp_millis(),
        }
    }

    pub fn to_json(&self) -> String {
        // A Frame is plain strings, numbers and an already valid Value.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Live position as exchanged over the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePosition {
    pub ride_id: RideId,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default, rename = "timestamp")]
    pub captured_at: Option<DateTime<Utc>>,
    /// Set when the position belongs to a batch awaiting `position_ack`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<u64>,
}

impl From<&PositionSample> for LivePosition {
    fn from(sample: &PositionSample) -> Self {
        Self {
            ride_id: sample.ride_id,
            lat: sample.lat,
            lng: sample.lng,
            accuracy: Some(sample.accuracy),
            heading: sample.heading,
            speed: sample.speed,
            captured_at: Some(sample.captured_at),
            batch_id: None,
        }
    }
}

/// Messages the client sends.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Auth { user_id: String },
    JoinRide { ride_id: RideId },
    LeaveRide { ride_id: RideId },
    Position(LivePosition),
    Ping,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserData<'a> {
    user_id: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RideData {
    ride_id: RideId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AckData {
    batch_id: u64,
    count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RideStatusData {
    ride_id: RideId,
    status: RideStatus,
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::JoinRide { .. } => "join_ride",
            Self::LeaveRide { .. } => "leave_ride",
            Self::Position(_) => "position",
            Self::Ping => "ping",
        }
    }

    pub fn to_frame(&self, at: DateTime<Utc>) -> Frame {
        let data = match self {
            Self::Auth { user_id } => serde_json::to_value(UserData { user_id }),
            Self::JoinRide { ride_id } | Self::LeaveRide { ride_id } => {
                serde_json::to_value(RideData { ride_id: *ride_id })
            }
            Self::Position(position) => serde_json::to_value(position),
            Self::Ping => Ok(serde_json::Value::Object(Default::default())),
        };
        Frame::new(self.kind(), data.unwrap_or_default(), at)
    }
}

/// Messages the server sends that the client understands.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Another participant's live position.
    Position(LivePosition),
    RideStatus { ride_id: RideId, status: RideStatus },
    DriverArrived { ride_id: RideId },
    /// The server stored `count` positions of batch `batch_id`.
    PositionAck { batch_id: u64, count: usize },
    /// Any other frame, kept for per-type handlers.
    Other(Frame),
}

impl InboundMessage {
    /// Interpret a frame. Known types with malformed data become `Other`.
    pub fn from_frame(frame: &Frame) -> Self {
        let parsed = match frame.kind.as_str() {
            "position" => serde_json::from_value(frame.data.clone())
                .ok()
                .map(InboundMessage::Position),
            "ride_status" => serde_json::from_value::<RideStatusData>(frame.data.clone())
                .ok()
                .map(|d| InboundMessage::RideStatus {
                    ride_id: d.ride_id,
                    status: d.status,
                }),
            "driver_arrived" => serde_json::from_value::<RideData>(frame.data.clone())
                .ok()
                .map(|d| InboundMessage::DriverArrived { ride_id: d.ride_id }),
            "position_ack" => serde_json::from_value::<AckData>(frame.data.clone())
                .ok()
                .map(|d| InboundMessage::PositionAck {
                    batch_id: d.batch_id,
                    count: d.count,
                }),
            _ => None,
        };
        parsed.unwrap_or_else(|| InboundMessage::Other(frame.clone()))
    }
}
