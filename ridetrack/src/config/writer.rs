//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let user_id = config.connection.user_id.as_deref().unwrap_or("");
    let replay_file = config
        .sampler
        .replay_file
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();

    format!(
        r#"[tracking]
; Minimum movement in meters before a new sample is accepted
distance_filter_m = {}
; A sample is also accepted once this many milliseconds passed since the
; last accepted one; the live position push runs on the same period
min_update_interval_ms = {}
; Accepted samples kept in memory for trip statistics and ETA
history_length = {}
; Sampling profile while watching:
;   high-accuracy - 3D fix required, 30s timeout, no cached fixes
;   continuous    - 3D fix required, 30s timeout, fixes up to 5s old reused
;   quick         - 2D fix accepted, 5s timeout, fixes up to 60s old reused
accuracy_profile = {}
; Upper bound on the final flush when a session stops
final_flush_timeout_ms = {}

[sync]
; Flush interval while a session is active
interval_ms = {}
; Maximum positions per network call
batch_size = {}
; Synced records older than this are purged
purge_after_hours = {}

[connection]
; Use the persistent WebSocket channel (HTTP is always the fallback)
enabled = {}
url = {}
; Reconnect delay for attempt n is reconnect_base_ms * 1.5^(n-1)
reconnect_base_ms = {}
reconnect_max_attempts = {}
heartbeat_ms = {}
; Sent as auth on every connect (leave empty to skip)
user_id = {}

[api]
; Positions are posted to <base_url>/rides
base_url = {}
timeout_secs = {}

[sampler]
; Location source: gpsd or replay
source = {}
gpsd_addr = {}
; JSON-lines track used when source = replay
replay_file = {}
replay_speed = {}

[store]
path = {}

[logging]
file = {}
"#,
        config.tracking.distance_filter_m,
        config.tracking.min_update_interval_ms,
        config.tracking.history_length,
        config.tracking.accuracy_profile.as_str(),
        config.tracking.final_flush_timeout_ms,
        config.sync.interval_ms,
        config.sync.batch_size,
        config.sync.purge_after_hours,
        config.connection.enabled,
        config.connection.url,
        config.connection.reconnect_base_ms,
        config.connection.reconnect_max_attempts,
        config.connection.heartbeat_ms,
        user_id,
        config.api.base_url,
        config.api.timeout_secs,
        config.sampler.source.as_str(),
        config.sampler.gpsd_addr,
        replay_file,
        config.sampler.replay_speed,
        path_to_string(&config.store.path),
        path_to_string(&config.logging.file),
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_config_parses_back() {
        let config = ConfigFile::default();
        let content = to_config_string(&config);

        let ini = ini::Ini::load_from_str(&content).unwrap();
        let parsed = super::super::parser::parse_ini(&ini).unwrap();

        assert_eq!(parsed.tracking.history_length, config.tracking.history_length);
        assert_eq!(parsed.connection.url, config.connection.url);
        assert_eq!(parsed.store.path, config.store.path);
    }

    #[test]
    fn test_contains_every_section() {
        let content = to_config_string(&ConfigFile::default());
        for section in [
            "[tracking]",
            "[sync]",
            "[connection]",
            "[api]",
            "[sampler]",
            "[store]",
            "[logging]",
        ] {
            assert!(content.contains(section), "missing {section}");
        }
    }
}
