//! Configuration for ridetrack components.
//!
//! The user-facing configuration lives in `~/.ridetrack/config.ini` and is
//! loaded into a [`ConfigFile`]. Each component takes its own small config
//! struct, derived from the file via the conversions in `convert`:
//!
//! - [`TrackingConfig`](crate::tracking::TrackingConfig) - filter and timers
//! - [`SyncConfig`](crate::sync::SyncConfig) - batching
//! - [`SupervisorConfig`](crate::connection::SupervisorConfig) - WebSocket lifecycle
//! - [`HttpConfig`](crate::transport::HttpConfig) - REST fallback
//!
//! # Example
//!
//! ```ignore
//! use ridetrack::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! let tracking = config.tracking_config();
//! ```

mod convert;
mod defaults;
mod file;
mod keys;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use keys::{ConfigKey, ConfigKeyError};
pub use settings::{
    ApiSettings, ConfigFile, ConnectionSettings, LoggingSettings, SamplerSettings, SamplerSource,
    StoreSettings, SyncSettings, TrackingSettings,
};

pub use defaults::*;
