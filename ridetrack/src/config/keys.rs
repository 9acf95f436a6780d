//! Configuration key access and validation.
//!
//! This module provides a type-safe interface for getting and setting
//! configuration values by key name, with validation via the Specification Pattern.

use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use super::file::ConfigFile;
use super::parser::{expand_tilde, optional_string, parse_bool};
use super::settings::SamplerSource;
use crate::sampler::ProfileKind;

/// Errors that can occur when getting or setting configuration values.
#[derive(Debug, Error)]
pub enum ConfigKeyError {
    /// Unknown configuration key.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// Validation failed for the value.
    #[error("Invalid value for {key}: {reason}")]
    ValidationFailed { key: String, reason: String },
}

/// Supported configuration keys.
///
/// Each key maps to a specific field in [`ConfigFile`] and knows how to
/// get and set its value with proper validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    // Tracking settings
    TrackingDistanceFilterM,
    TrackingMinUpdateIntervalMs,
    TrackingHistoryLength,
    TrackingAccuracyProfile,
    TrackingFinalFlushTimeoutMs,

    // Sync settings
    SyncIntervalMs,
    SyncBatchSize,
    SyncPurgeAfterHours,

    // Connection settings
    ConnectionEnabled,
    ConnectionUrl,
    ConnectionReconnectBaseMs,
    ConnectionReconnectMaxAttempts,
    ConnectionHeartbeatMs,
    ConnectionUserId,

    // API settings
    ApiBaseUrl,
    ApiTimeoutSecs,

    // Sampler settings
    SamplerSource,
    SamplerGpsdAddr,
    SamplerReplayFile,
    SamplerReplaySpeed,

    // Store settings
    StorePath,

    // Logging settings
    LoggingFile,
}

impl FromStr for ConfigKey {
    type Err = ConfigKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == lower)
            .ok_or_else(|| ConfigKeyError::UnknownKey(s.to_string()))
    }
}

impl ConfigKey {
    /// Get the full key name (e.g., "tracking.distance_filter_m").
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::TrackingDistanceFilterM => "tracking.distance_filter_m",
            ConfigKey::TrackingMinUpdateIntervalMs => "tracking.min_update_interval_ms",
            ConfigKey::TrackingHistoryLength => "tracking.history_length",
            ConfigKey::TrackingAccuracyProfile => "tracking.accuracy_profile",
            ConfigKey::TrackingFinalFlushTimeoutMs => "tracking.final_flush_timeout_ms",
            ConfigKey::SyncIntervalMs => "sync.interval_ms",
            ConfigKey::SyncBatchSize => "sync.batch_size",
            ConfigKey::SyncPurgeAfterHours => "sync.purge_after_hours",
            ConfigKey::ConnectionEnabled => "connection.enabled",
            ConfigKey::ConnectionUrl => "connection.url",
            ConfigKey::ConnectionReconnectBaseMs => "connection.reconnect_base_ms",
            ConfigKey::ConnectionReconnectMaxAttempts => "connection.reconnect_max_attempts",
            ConfigKey::ConnectionHeartbeatMs => "connection.heartbeat_ms",
            ConfigKey::ConnectionUserId => "connection.user_id",
            ConfigKey::ApiBaseUrl => "api.base_url",
            ConfigKey::ApiTimeoutSecs => "api.timeout_secs",
            ConfigKey::SamplerSource => "sampler.source",
            ConfigKey::SamplerGpsdAddr => "sampler.gpsd_addr",
            ConfigKey::SamplerReplayFile => "sampler.replay_file",
            ConfigKey::SamplerReplaySpeed => "sampler.replay_speed",
            ConfigKey::StorePath => "store.path",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    /// Get the section name (e.g., "tracking").
    pub fn section(&self) -> &'static str {
        self.name().split('.').next().unwrap_or("")
    }

    /// Get the key name within the section (e.g., "distance_filter_m").
    pub fn key_name(&self) -> &'static str {
        self.name().split('.').nth(1).unwrap_or(self.name())
    }

    /// Get the value from a config file as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::TrackingDistanceFilterM => config.tracking.distance_filter_m.to_string(),
            ConfigKey::TrackingMinUpdateIntervalMs => {
                config.tracking.min_update_interval_ms.to_string()
            }
            ConfigKey::TrackingHistoryLength => config.tracking.history_length.to_string(),
            ConfigKey::TrackingAccuracyProfile => {
                config.tracking.accuracy_profile.as_str().to_string()
            }
            ConfigKey::TrackingFinalFlushTimeoutMs => {
                config.tracking.final_flush_timeout_ms.to_string()
            }
            ConfigKey::SyncIntervalMs => config.sync.interval_ms.to_string(),
            ConfigKey::SyncBatchSize => config.sync.batch_size.to_string(),
            ConfigKey::SyncPurgeAfterHours => config.sync.purge_after_hours.to_string(),
            ConfigKey::ConnectionEnabled => config.connection.enabled.to_string(),
            ConfigKey::ConnectionUrl => config.connection.url.clone(),
            ConfigKey::ConnectionReconnectBaseMs => config.connection.reconnect_base_ms.to_string(),
            ConfigKey::ConnectionReconnectMaxAttempts => {
                config.connection.reconnect_max_attempts.to_string()
            }
            ConfigKey::ConnectionHeartbeatMs => config.connection.heartbeat_ms.to_string(),
            ConfigKey::ConnectionUserId => config.connection.user_id.clone().unwrap_or_default(),
            ConfigKey::ApiBaseUrl => config.api.base_url.clone(),
            ConfigKey::ApiTimeoutSecs => config.api.timeout_secs.to_string(),
            ConfigKey::SamplerSource => config.sampler.source.as_str().to_string(),
            ConfigKey::SamplerGpsdAddr => config.sampler.gpsd_addr.clone(),
            ConfigKey::SamplerReplayFile => config
                .sampler
                .replay_file
                .as_ref()
                .map(|p| path_to_display(p))
                .unwrap_or_default(),
            ConfigKey::SamplerReplaySpeed => config.sampler.replay_speed.to_string(),
            ConfigKey::StorePath => path_to_display(&config.store.path),
            ConfigKey::LoggingFile => path_to_display(&config.logging.file),
        }
    }

    /// Set the value in a config file.
    ///
    /// Validates the value according to the key's specification before setting.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigKeyError> {
        self.validate(value)?;
        self.apply(config, value.trim())
            .map_err(|reason| ConfigKeyError::ValidationFailed {
                key: self.name().to_string(),
                reason,
            })
    }

    /// Write an already validated value into the config.
    fn apply(&self, config: &mut ConfigFile, value: &str) -> Result<(), String> {
        fn num<T: FromStr>(value: &str) -> Result<T, String> {
            value.parse().map_err(|_| format!("cannot parse '{}'", value))
        }

        match self {
            ConfigKey::TrackingDistanceFilterM => config.tracking.distance_filter_m = num(value)?,
            ConfigKey::TrackingMinUpdateIntervalMs => {
                config.tracking.min_update_interval_ms = num(value)?
            }
            ConfigKey::TrackingHistoryLength => config.tracking.history_length = num(value)?,
            ConfigKey::TrackingAccuracyProfile => {
                config.tracking.accuracy_profile = value.parse::<ProfileKind>()?
            }
            ConfigKey::TrackingFinalFlushTimeoutMs => {
                config.tracking.final_flush_timeout_ms = num(value)?
            }
            ConfigKey::SyncIntervalMs => config.sync.interval_ms = num(value)?,
            ConfigKey::SyncBatchSize => config.sync.batch_size = num(value)?,
            ConfigKey::SyncPurgeAfterHours => config.sync.purge_after_hours = num(value)?,
            ConfigKey::ConnectionEnabled => config.connection.enabled = parse_bool(value),
            ConfigKey::ConnectionUrl => config.connection.url = value.to_string(),
            ConfigKey::ConnectionReconnectBaseMs => {
                config.connection.reconnect_base_ms = num(value)?
            }
            ConfigKey::ConnectionReconnectMaxAttempts => {
                config.connection.reconnect_max_attempts = num(value)?
            }
            ConfigKey::ConnectionHeartbeatMs => config.connection.heartbeat_ms = num(value)?,
            ConfigKey::ConnectionUserId => config.connection.user_id = optional_string(value),
            ConfigKey::ApiBaseUrl => {
                config.api.base_url = value.trim_end_matches('/').to_string();
            }
            ConfigKey::ApiTimeoutSecs => config.api.timeout_secs = num(value)?,
            ConfigKey::SamplerSource => config.sampler.source = value.parse::<SamplerSource>()?,
            ConfigKey::SamplerGpsdAddr => config.sampler.gpsd_addr = value.to_string(),
            ConfigKey::SamplerReplayFile => {
                config.sampler.replay_file = optional_string(value).map(|p| expand_tilde(&p))
            }
            ConfigKey::SamplerReplaySpeed => config.sampler.replay_speed = num(value)?,
            ConfigKey::StorePath => config.store.path = expand_tilde(value),
            ConfigKey::LoggingFile => config.logging.file = expand_tilde(value),
        }
        Ok(())
    }

    /// Validate a value according to this key's specification.
    pub fn validate(&self, value: &str) -> Result<(), ConfigKeyError> {
        self.specification()
            .is_satisfied_by(value.trim())
            .map_err(|reason| ConfigKeyError::ValidationFailed {
                key: self.name().to_string(),
                reason,
            })
    }

    /// Get the validation specification for this key.
    fn specification(&self) -> Box<dyn ValueSpecification> {
        match self {
            ConfigKey::TrackingDistanceFilterM => Box::new(PositiveNumberSpec),
            ConfigKey::TrackingMinUpdateIntervalMs => Box::new(NonZeroIntegerSpec),
            ConfigKey::TrackingHistoryLength => Box::new(NonZeroIntegerSpec),
            ConfigKey::TrackingAccuracyProfile => Box::new(OneOfSpec::new(&[
                "high-accuracy",
                "continuous",
                "quick",
            ])),
            ConfigKey::TrackingFinalFlushTimeoutMs => Box::new(NonZeroIntegerSpec),
            ConfigKey::SyncIntervalMs => Box::new(NonZeroIntegerSpec),
            ConfigKey::SyncBatchSize => Box::new(NonZeroIntegerSpec),
            ConfigKey::SyncPurgeAfterHours => Box::new(PositiveIntegerSpec),
            ConfigKey::ConnectionEnabled => Box::new(BooleanSpec),
            ConfigKey::ConnectionUrl => Box::new(UrlSpec::new(&["ws://", "wss://"])),
            ConfigKey::ConnectionReconnectBaseMs => Box::new(NonZeroIntegerSpec),
            ConfigKey::ConnectionReconnectMaxAttempts => Box::new(PositiveIntegerSpec),
            ConfigKey::ConnectionHeartbeatMs => Box::new(NonZeroIntegerSpec),
            ConfigKey::ConnectionUserId => Box::new(AnyStringSpec),
            ConfigKey::ApiBaseUrl => Box::new(UrlSpec::new(&["http://", "https://"])),
            ConfigKey::ApiTimeoutSecs => Box::new(NonZeroIntegerSpec),
            ConfigKey::SamplerSource => Box::new(OneOfSpec::new(&["gpsd", "replay"])),
            ConfigKey::SamplerGpsdAddr => Box::new(NonEmptySpec),
            ConfigKey::SamplerReplayFile => Box::new(AnyStringSpec),
            ConfigKey::SamplerReplaySpeed => Box::new(PositiveNumberSpec),
            ConfigKey::StorePath => Box::new(NonEmptySpec),
            ConfigKey::LoggingFile => Box::new(NonEmptySpec),
        }
    }

    /// Get all supported configuration keys.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::TrackingDistanceFilterM,
            ConfigKey::TrackingMinUpdateIntervalMs,
            ConfigKey::TrackingHistoryLength,
            ConfigKey::TrackingAccuracyProfile,
            ConfigKey::TrackingFinalFlushTimeoutMs,
            ConfigKey::SyncIntervalMs,
            ConfigKey::SyncBatchSize,
            ConfigKey::SyncPurgeAfterHours,
            ConfigKey::ConnectionEnabled,
            ConfigKey::ConnectionUrl,
            ConfigKey::ConnectionReconnectBaseMs,
            ConfigKey::ConnectionReconnectMaxAttempts,
            ConfigKey::ConnectionHeartbeatMs,
            ConfigKey::ConnectionUserId,
            ConfigKey::ApiBaseUrl,
            ConfigKey::ApiTimeoutSecs,
            ConfigKey::SamplerSource,
            ConfigKey::SamplerGpsdAddr,
            ConfigKey::SamplerReplayFile,
            ConfigKey::SamplerReplaySpeed,
            ConfigKey::StorePath,
            ConfigKey::LoggingFile,
        ]
    }
}

// ============================================================================
// Value Specifications (Specification Pattern)
// ============================================================================

/// Trait for value validation specifications.
trait ValueSpecification {
    /// Returns Ok(()) if valid, Err(reason) if invalid.
    fn is_satisfied_by(&self, value: &str) -> Result<(), String>;
}

/// Specification that accepts any string value.
struct AnyStringSpec;

impl ValueSpecification for AnyStringSpec {
    fn is_satisfied_by(&self, _value: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Specification that requires a non-empty value.
struct NonEmptySpec;

impl ValueSpecification for NonEmptySpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        if value.is_empty() {
            Err("must not be empty".to_string())
        } else {
            Ok(())
        }
    }
}

/// Specification that requires the value to be one of a set of options.
struct OneOfSpec {
    options: &'static [&'static str],
}

impl OneOfSpec {
    fn new(options: &'static [&'static str]) -> Self {
        Self { options }
    }
}

impl ValueSpecification for OneOfSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        let lower = value.to_lowercase();
        if self.options.iter().any(|opt| *opt == lower) {
            Ok(())
        } else {
            Err(format!("must be one of: {}", self.options.join(", ")))
        }
    }
}

/// Specification for non-negative integer values.
struct PositiveIntegerSpec;

impl ValueSpecification for PositiveIntegerSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        value
            .parse::<u64>()
            .map(|_| ())
            .map_err(|_| "must be a positive integer".to_string())
    }
}

/// Specification for integers greater than zero.
struct NonZeroIntegerSpec;

impl ValueSpecification for NonZeroIntegerSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        match value.parse::<u64>() {
            Ok(n) if n > 0 => Ok(()),
            _ => Err("must be an integer greater than 0".to_string()),
        }
    }
}

/// Specification for positive floating-point number values.
struct PositiveNumberSpec;

impl ValueSpecification for PositiveNumberSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        match value.parse::<f64>() {
            Ok(n) if n > 0.0 && n.is_finite() => Ok(()),
            _ => Err("must be a positive number".to_string()),
        }
    }
}

/// Specification for boolean values.
struct BooleanSpec;

impl ValueSpecification for BooleanSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        let lower = value.to_lowercase();
        let valid = ["true", "false", "yes", "no", "1", "0", "on", "off"];
        if valid.contains(&lower.as_str()) {
            Ok(())
        } else {
            Err("must be true/false, yes/no, 1/0, or on/off".to_string())
        }
    }
}

/// Specification for URLs with one of the given schemes.
struct UrlSpec {
    schemes: &'static [&'static str],
}

impl UrlSpec {
    fn new(schemes: &'static [&'static str]) -> Self {
        Self { schemes }
    }
}

impl ValueSpecification for UrlSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        if self.schemes.iter().any(|s| value.starts_with(s)) {
            Ok(())
        } else {
            Err(format!("must be a URL starting with {}", self.schemes.join(" or ")))
        }
    }
}

/// Convert path to display string, collapsing home dir to ~.
fn path_to_display(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_round_trips_by_name() {
        for key in ConfigKey::all() {
            let parsed: ConfigKey = key.name().parse().unwrap();
            assert_eq!(parsed, *key);
        }
    }

    #[test]
    fn test_unknown_key() {
        let result = "tracking.nope".parse::<ConfigKey>();
        assert!(matches!(result, Err(ConfigKeyError::UnknownKey(_))));
    }

    #[test]
    fn test_section_and_key_name() {
        let key = ConfigKey::SyncBatchSize;
        assert_eq!(key.section(), "sync");
        assert_eq!(key.key_name(), "batch_size");
    }

    #[test]
    fn test_set_and_get_batch_size() {
        let mut config = ConfigFile::default();
        ConfigKey::SyncBatchSize.set(&mut config, "25").unwrap();
        assert_eq!(config.sync.batch_size, 25);
        assert_eq!(ConfigKey::SyncBatchSize.get(&config), "25");
    }

    #[test]
    fn test_set_rejects_zero_batch_size() {
        let mut config = ConfigFile::default();
        let err = ConfigKey::SyncBatchSize.set(&mut config, "0").unwrap_err();
        assert!(matches!(err, ConfigKeyError::ValidationFailed { .. }));
        assert_eq!(config.sync.batch_size, 50);
    }

    #[test]
    fn test_set_profile_is_case_insensitive() {
        let mut config = ConfigFile::default();
        ConfigKey::TrackingAccuracyProfile
            .set(&mut config, "Quick")
            .unwrap();
        assert_eq!(config.tracking.accuracy_profile, ProfileKind::Quick);
    }

    #[test]
    fn test_set_connection_url_requires_ws_scheme() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::ConnectionUrl
            .set(&mut config, "https://example.com")
            .is_err());
        ConfigKey::ConnectionUrl
            .set(&mut config, "wss://rides.example.com/ws")
            .unwrap();
        assert_eq!(config.connection.url, "wss://rides.example.com/ws");
    }

    #[test]
    fn test_clear_user_id() {
        let mut config = ConfigFile::default();
        ConfigKey::ConnectionUserId.set(&mut config, "u-1").unwrap();
        assert_eq!(config.connection.user_id.as_deref(), Some("u-1"));
        ConfigKey::ConnectionUserId.set(&mut config, "").unwrap();
        assert!(config.connection.user_id.is_none());
    }
}
