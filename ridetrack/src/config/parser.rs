//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [tracking] section
    if let Some(section) = ini.section(Some("tracking")) {
        if let Some(v) = section.get("distance_filter_m") {
            config.tracking.distance_filter_m =
                parse_value(v, "tracking", "distance_filter_m", "must be a number of meters")?;
        }
        if let Some(v) = section.get("min_update_interval_ms") {
            config.tracking.min_update_interval_ms = parse_value(
                v,
                "tracking",
                "min_update_interval_ms",
                "must be a positive integer (milliseconds)",
            )?;
        }
        if let Some(v) = section.get("history_length") {
            config.tracking.history_length =
                parse_value(v, "tracking", "history_length", "must be a positive integer")?;
        }
        if let Some(v) = section.get("accuracy_profile") {
            config.tracking.accuracy_profile = parse_value(
                v,
                "tracking",
                "accuracy_profile",
                "must be one of: high-accuracy, continuous, quick",
            )?;
        }
        if let Some(v) = section.get("final_flush_timeout_ms") {
            config.tracking.final_flush_timeout_ms = parse_value(
                v,
                "tracking",
                "final_flush_timeout_ms",
                "must be a positive integer (milliseconds)",
            )?;
        }
    }

    // [sync] section
    if let Some(section) = ini.section(Some("sync")) {
        if let Some(v) = section.get("interval_ms") {
            config.sync.interval_ms = parse_value(
                v,
                "sync",
                "interval_ms",
                "must be a positive integer (milliseconds)",
            )?;
        }
        if let Some(v) = section.get("batch_size") {
            let size: usize =
                parse_value(v, "sync", "batch_size", "must be a positive integer")?;
            if size == 0 {
                return Err(invalid("sync", "batch_size", v, "must be at least 1"));
            }
            config.sync.batch_size = size;
        }
        if let Some(v) = section.get("purge_after_hours") {
            config.sync.purge_after_hours =
                parse_value(v, "sync", "purge_after_hours", "must be a positive integer")?;
        }
    }

    // [connection] section
    if let Some(section) = ini.section(Some("connection")) {
        if let Some(v) = section.get("enabled") {
            config.connection.enabled = parse_bool(v);
        }
        if let Some(v) = section.get("url") {
            let v = v.trim();
            if !(v.starts_with("ws://") || v.starts_with("wss://")) {
                return Err(invalid(
                    "connection",
                    "url",
                    v,
                    "must start with 'ws://' or 'wss://'",
                ));
            }
            config.connection.url = v.to_string();
        }
        if let Some(v) = section.get("reconnect_base_ms") {
            config.connection.reconnect_base_ms = parse_value(
                v,
                "connection",
                "reconnect_base_ms",
                "must be a positive integer (milliseconds)",
            )?;
        }
        if let Some(v) = section.get("reconnect_max_attempts") {
            config.connection.reconnect_max_attempts = parse_value(
                v,
                "connection",
                "reconnect_max_attempts",
                "must be a positive integer",
            )?;
        }
        if let Some(v) = section.get("heartbeat_ms") {
            config.connection.heartbeat_ms = parse_value(
                v,
                "connection",
                "heartbeat_ms",
                "must be a positive integer (milliseconds)",
            )?;
        }
        if let Some(v) = section.get("user_id") {
            config.connection.user_id = optional_string(v);
        }
    }

    // [api] section
    if let Some(section) = ini.section(Some("api")) {
        if let Some(v) = section.get("base_url") {
            let v = v.trim().trim_end_matches('/');
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(invalid(
                    "api",
                    "base_url",
                    v,
                    "must start with 'http://' or 'https://'",
                ));
            }
            config.api.base_url = v.to_string();
        }
        if let Some(v) = section.get("timeout_secs") {
            config.api.timeout_secs = parse_value(
                v,
                "api",
                "timeout_secs",
                "must be a positive integer (seconds)",
            )?;
        }
    }

    // [sampler] section
    if let Some(section) = ini.section(Some("sampler")) {
        if let Some(v) = section.get("source") {
            config.sampler.source =
                parse_value(v, "sampler", "source", "must be 'gpsd' or 'replay'")?;
        }
        if let Some(v) = section.get("gpsd_addr") {
            let v = v.trim();
            if !v.is_empty() {
                config.sampler.gpsd_addr = v.to_string();
            }
        }
        if let Some(v) = section.get("replay_file") {
            config.sampler.replay_file = optional_string(v).map(|p| expand_tilde(&p));
        }
        if let Some(v) = section.get("replay_speed") {
            let speed: f64 =
                parse_value(v, "sampler", "replay_speed", "must be a positive number")?;
            if speed <= 0.0 {
                return Err(invalid("sampler", "replay_speed", v, "must be greater than 0"));
            }
            config.sampler.replay_speed = speed;
        }
    }

    // [store] section
    if let Some(section) = ini.section(Some("store")) {
        if let Some(v) = section.get("path") {
            let v = v.trim();
            if !v.is_empty() {
                config.store.path = expand_tilde(v);
            }
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Parse a trimmed value, mapping failures to `InvalidValue`.
fn parse_value<T: FromStr>(
    value: &str,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Convert empty string to None.
pub(super) fn optional_string(value: &str) -> Option<String> {
    let v = value.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use crate::config::settings::SamplerSource;
    use crate::sampler::ProfileKind;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_ini_yields_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.tracking.distance_filter_m, DEFAULT_DISTANCE_FILTER_M);
        assert_eq!(config.sync.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_overlays_tracking_values() {
        let config = parse(
            "[tracking]\ndistance_filter_m = 15.5\nmin_update_interval_ms = 2000\naccuracy_profile = quick\n",
        )
        .unwrap();

        assert_eq!(config.tracking.distance_filter_m, 15.5);
        assert_eq!(config.tracking.min_update_interval_ms, 2000);
        assert_eq!(config.tracking.accuracy_profile, ProfileKind::Quick);
        assert_eq!(config.tracking.history_length, DEFAULT_HISTORY_LENGTH);
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let err = parse("[sync]\nbatch_size = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::InvalidValue { ref key, .. } if key == "batch_size"
        ));
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        let err = parse("[connection]\nurl = http://example.com\n").unwrap_err();
        assert!(err.to_string().contains("connection.url"));
    }

    #[test]
    fn test_api_base_url_trailing_slash_trimmed() {
        let config = parse("[api]\nbase_url = https://rides.example.com/api/\n").unwrap();
        assert_eq!(config.api.base_url, "https://rides.example.com/api");
    }

    #[test]
    fn test_empty_user_id_is_none() {
        let config = parse("[connection]\nuser_id = \n").unwrap();
        assert!(config.connection.user_id.is_none());
    }

    #[test]
    fn test_sampler_source_and_speed() {
        let config = parse("[sampler]\nsource = REPLAY\nreplay_speed = 4\n").unwrap();
        assert_eq!(config.sampler.source, SamplerSource::Replay);
        assert_eq!(config.sampler.replay_speed, 4.0);

        assert!(parse("[sampler]\nreplay_speed = 0\n").is_err());
        assert!(parse("[sampler]\nsource = corelocation\n").is_err());
    }

    #[test]
    fn test_parse_bool_variants() {
        assert!(parse_bool("yes"));
        assert!(parse_bool(" ON "));
        assert!(!parse_bool("off"));
        assert!(!parse_bool("nope"));
    }
}
