//! Conversions from the INI-level settings to per-component configs.

use std::time::Duration;

use super::settings::ConfigFile;
use crate::connection::SupervisorConfig;
use crate::sync::SyncConfig;
use crate::tracking::TrackingConfig;
use crate::transport::HttpConfig;

impl ConfigFile {
    /// Session filter, history and timer settings.
    pub fn tracking_config(&self) -> TrackingConfig {
        TrackingConfig {
            distance_filter_m: self.tracking.distance_filter_m,
            min_update_interval: Duration::from_millis(self.tracking.min_update_interval_ms),
            history_length: self.tracking.history_length,
            profile: self.tracking.accuracy_profile,
            sync_interval: Duration::from_millis(self.sync.interval_ms),
            final_flush_timeout: Duration::from_millis(self.tracking.final_flush_timeout_ms),
        }
    }

    /// Batching settings for the sync engine.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            batch_size: self.sync.batch_size,
        }
    }

    /// WebSocket lifecycle settings.
    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            url: self.connection.url.clone(),
            reconnect_base: Duration::from_millis(self.connection.reconnect_base_ms),
            max_attempts: self.connection.reconnect_max_attempts,
            heartbeat_interval: Duration::from_millis(self.connection.heartbeat_ms),
            user_id: self.connection.user_id.clone(),
        }
    }

    /// REST fallback settings.
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }

    /// Age after which synced records may be purged.
    pub fn purge_after(&self) -> Duration {
        Duration::from_secs(self.sync.purge_after_hours * 3600)
    }
}
