//! ridetrack - position tracking and offline sync for ride-hailing clients
//!
//! This library captures GPS fixes for an active ride, persists them to a
//! durable local store and delivers them to the ride API in batches, over a
//! persistent WebSocket channel when one is connected and over HTTP otherwise.
//!
//! # Pipeline
//!
//! ```text
//! GeoSampler ──► TrackingCoordinator ──► LocalStore ──► SyncEngine ──► Transport
//!  (gpsd/replay)   (filter + stats)       (SQLite)      (batches)      (ws | http)
//!                                                                         ▲
//!                                                     ConnectionSupervisor┘
//! ```
//!
//! # High-Level API
//!
//! ```ignore
//! use ridetrack::tracking::{TrackingCoordinator, TrackingConfig};
//!
//! let coordinator = TrackingCoordinator::new(sampler, store, sync_engine, live, config);
//! coordinator.start(RideId(42)).await?;
//! // ... fixes are filtered, stored and flushed in the background ...
//! let summary = coordinator.stop().await;
//! ```

pub mod config;
pub mod connection;
pub mod geo;
pub mod logging;
pub mod position;
pub mod sampler;
pub mod store;
pub mod sync;
pub mod tracking;
pub mod transport;

pub use position::{GeoFix, PositionSample, RideId, StoredPosition, SyncState};

/// Version of the ridetrack library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
