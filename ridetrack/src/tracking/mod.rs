//! Ride tracking sessions.
//!
//! [`TrackingCoordinator`] owns the session lifecycle. The pieces it is built
//! from are usable on their own:
//!
//! - [`SampleFilter`] - distance/time acceptance of incoming samples
//! - [`TripStats`] - running distance and speed totals
//! - [`History`] - bounded FIFO of accepted samples
//! - [`estimate_eta`] - advisory arrival estimate

mod coordinator;
mod error;
mod eta;
mod filter;
mod history;
mod stats;

pub use coordinator::{
    FinalFlush, SessionSummary, TrackingConfig, TrackingCoordinator, TrackingEvent, TrackingState,
};
pub use error::TrackingError;
pub use eta::{
    estimate_eta, estimate_with_speed, Eta, DEFAULT_URBAN_SPEED_KMH, MIN_MOVING_SPEED_KMH,
};
pub use filter::{FilterDecision, SampleFilter};
pub use history::History;
pub use stats::TripStats;
