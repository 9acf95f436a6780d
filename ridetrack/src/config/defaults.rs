//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use super::settings::*;
use crate::sampler::ProfileKind;

// =============================================================================
// Tracking defaults
// =============================================================================

/// Default minimum movement between accepted samples (meters).
pub const DEFAULT_DISTANCE_FILTER_M: f64 = 10.0;

/// Default staleness window / live push period (milliseconds).
pub const DEFAULT_MIN_UPDATE_INTERVAL_MS: u64 = 5_000;

/// Default in-memory history length.
pub const DEFAULT_HISTORY_LENGTH: usize = 50;

/// Default bound on the final flush at session stop (milliseconds).
pub const DEFAULT_FINAL_FLUSH_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// Sync defaults
// =============================================================================

/// Default periodic flush interval (milliseconds).
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 10_000;

/// Default positions per batch.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default age before synced records are purged (hours).
pub const DEFAULT_PURGE_AFTER_HOURS: u64 = 72;

// =============================================================================
// Connection defaults
// =============================================================================

/// Default WebSocket endpoint.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws";

/// Default base reconnect delay (milliseconds).
pub const DEFAULT_RECONNECT_BASE_MS: u64 = 3_000;

/// Default reconnect attempts before giving up.
pub const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 10;

/// Default heartbeat period (milliseconds).
pub const DEFAULT_HEARTBEAT_MS: u64 = 30_000;

// =============================================================================
// API defaults
// =============================================================================

/// Default ride API base URL.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Default HTTP request timeout (seconds).
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Sampler defaults
// =============================================================================

/// Default gpsd address.
pub const DEFAULT_GPSD_ADDR: &str = "127.0.0.1:2947";

/// Default replay time scale.
pub const DEFAULT_REPLAY_SPEED: f64 = 1.0;

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = super::file::config_directory();

        Self {
            tracking: TrackingSettings {
                distance_filter_m: DEFAULT_DISTANCE_FILTER_M,
                min_update_interval_ms: DEFAULT_MIN_UPDATE_INTERVAL_MS,
                history_length: DEFAULT_HISTORY_LENGTH,
                accuracy_profile: ProfileKind::Continuous,
                final_flush_timeout_ms: DEFAULT_FINAL_FLUSH_TIMEOUT_MS,
            },
            sync: SyncSettings {
                interval_ms: DEFAULT_SYNC_INTERVAL_MS,
                batch_size: DEFAULT_BATCH_SIZE,
                purge_after_hours: DEFAULT_PURGE_AFTER_HOURS,
            },
            connection: ConnectionSettings {
                enabled: true,
                url: DEFAULT_WS_URL.to_string(),
                reconnect_base_ms: DEFAULT_RECONNECT_BASE_MS,
                reconnect_max_attempts: DEFAULT_RECONNECT_MAX_ATTEMPTS,
                heartbeat_ms: DEFAULT_HEARTBEAT_MS,
                user_id: None,
            },
            api: ApiSettings {
                base_url: DEFAULT_API_BASE_URL.to_string(),
                timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            },
            sampler: SamplerSettings {
                source: SamplerSource::Gpsd,
                gpsd_addr: DEFAULT_GPSD_ADDR.to_string(),
                replay_file: None,
                replay_speed: DEFAULT_REPLAY_SPEED,
            },
            store: StoreSettings {
                path: config_dir.join("ridetrack.db"),
            },
            logging: LoggingSettings {
                file: config_dir.join("logs").join("ridetrack.log"),
            },
        }
    }
}
