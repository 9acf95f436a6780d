//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::sampler::ProfileKind;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Session filtering and teardown
    pub tracking: TrackingSettings,
    /// Batch delivery
    pub sync: SyncSettings,
    /// Persistent WebSocket channel
    pub connection: ConnectionSettings,
    /// HTTP fallback API
    pub api: ApiSettings,
    /// Location source
    pub sampler: SamplerSettings,
    /// Local database
    pub store: StoreSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Tracking session configuration.
#[derive(Debug, Clone)]
pub struct TrackingSettings {
    /// Minimum movement in meters before a new sample is accepted.
    pub distance_filter_m: f64,
    /// Staleness window and live push period in milliseconds.
    pub min_update_interval_ms: u64,
    /// Number of accepted samples kept in memory for stats and ETA.
    pub history_length: usize,
    /// Sampling profile used while watching.
    pub accuracy_profile: ProfileKind,
    /// Upper bound on the final flush performed when a session stops.
    pub final_flush_timeout_ms: u64,
}

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Periodic flush interval while a session is active.
    pub interval_ms: u64,
    /// Maximum positions per network call.
    pub batch_size: usize,
    /// Age after which synced records are purged.
    pub purge_after_hours: u64,
}

/// WebSocket channel configuration.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Whether the persistent channel is used at all.
    pub enabled: bool,
    /// WebSocket URL (ws:// or wss://).
    pub url: String,
    /// Base reconnect delay; attempt n waits base * 1.5^(n-1).
    pub reconnect_base_ms: u64,
    /// Attempts before the supervisor gives up.
    pub reconnect_max_attempts: u32,
    /// Keepalive period while connected.
    pub heartbeat_ms: u64,
    /// User identity sent as `auth` on every connect.
    pub user_id: Option<String>,
}

/// HTTP API configuration.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base URL; positions are posted to `<base_url>/rides`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Which location source to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerSource {
    /// gpsd daemon over TCP.
    Gpsd,
    /// Recorded track file.
    Replay,
}

impl SamplerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpsd => "gpsd",
            Self::Replay => "replay",
        }
    }
}

impl std::str::FromStr for SamplerSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gpsd" => Ok(Self::Gpsd),
            "replay" => Ok(Self::Replay),
            other => Err(format!("unknown sampler source '{}'", other)),
        }
    }
}

/// Location source configuration.
#[derive(Debug, Clone)]
pub struct SamplerSettings {
    pub source: SamplerSource,
    /// gpsd address as host:port.
    pub gpsd_addr: String,
    /// Track file for the replay source.
    pub replay_file: Option<PathBuf>,
    /// Replay time scale (2.0 plays twice as fast).
    pub replay_speed: f64,
}

/// Local store configuration.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// SQLite database file.
    pub path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Log file path.
    pub file: PathBuf,
}
