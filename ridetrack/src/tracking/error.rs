//! Tracking session errors.

use thiserror::Error;

use crate::sampler::SamplerError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum TrackingError {
    /// The sensor cannot be used for tracking.
    #[error("Location sensor unavailable: {0}")]
    Sensor(#[from] SamplerError),

    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    /// An operation needs an active session.
    #[error("No active tracking session")]
    NotTracking,
}
