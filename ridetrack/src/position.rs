//! Core position types shared by every stage of the pipeline.
//!
//! - [`GeoFix`] - raw output of a location source
//! - [`PositionSample`] - a fix bound to a ride
//! - [`StoredPosition`] - a sample after the local store assigned it an id
//! - [`SyncState`] - local delivery state of a stored position

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a ride on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RideId(pub u64);

impl std::fmt::Display for RideId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RideId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RideId)
    }
}

/// A single position fix from a location source.
///
/// Speed is reported in meters per second and heading in degrees true,
/// matching what GPS receivers emit. Both are optional because not every
/// fix carries a velocity vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub lat: f64,
    pub lng: f64,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl GeoFix {
    /// Create a fix without velocity data.
    pub fn new(lat: f64, lng: f64, accuracy: f64, captured_at: DateTime<Utc>) -> Self {
        Self {
            lat,
            lng,
            accuracy,
            heading: None,
            speed: None,
            captured_at,
        }
    }

    /// Attach heading (degrees) and speed (m/s).
    pub fn with_velocity(mut self, heading: f64, speed: f64) -> Self {
        self.heading = Some(heading);
        self.speed = Some(speed);
        self
    }

    /// Position as (lat, lng).
    pub fn coordinates(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    /// Bind this fix to a ride.
    pub fn into_sample(self, ride_id: RideId) -> PositionSample {
        PositionSample {
            ride_id,
            lat: self.lat,
            lng: self.lng,
            accuracy: self.accuracy,
            heading: self.heading,
            speed: self.speed,
            captured_at: self.captured_at,
        }
    }
}

/// A position fix captured during a ride's tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub ride_id: RideId,
    pub lat: f64,
    pub lng: f64,
    pub accuracy: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl PositionSample {
    /// Position as (lat, lng).
    pub fn coordinates(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    /// Reported speed converted to km/h.
    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed.map(crate::geo::mps_to_kmh)
    }
}

/// Local delivery state of a stored position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Persisted locally, not yet acknowledged by the server.
    Pending,
    /// Delivered; eligible for purge once old enough.
    Synced,
}

impl SyncState {
    pub(crate) fn as_i64(self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::Synced => 1,
        }
    }

    pub(crate) fn from_i64(value: i64) -> Self {
        if value == 0 {
            Self::Pending
        } else {
            Self::Synced
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Synced => write!(f, "synced"),
        }
    }
}

/// A position sample owned by the local store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPosition {
    /// Monotonic id assigned by the store.
    pub local_id: i64,
    pub sample: PositionSample,
    pub sync_state: SyncState,
}
