//! Configuration file handling for ~/.ridetrack/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use super::defaults::*;
pub use super::settings::*;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.ridetrack/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }
}

/// Get the path to the config directory (~/.ridetrack).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ridetrack")
}

/// Get the path to the config file (~/.ridetrack/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::ProfileKind;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.tracking.distance_filter_m, 10.0);
        assert_eq!(config.tracking.min_update_interval_ms, 5_000);
        assert_eq!(config.tracking.history_length, 50);
        assert_eq!(config.tracking.accuracy_profile, ProfileKind::Continuous);
        assert_eq!(config.sync.interval_ms, 10_000);
        assert_eq!(config.sync.batch_size, 50);
        assert_eq!(config.connection.reconnect_base_ms, 3_000);
        assert_eq!(config.connection.reconnect_max_attempts, 10);
        assert_eq!(config.connection.heartbeat_ms, 30_000);
        assert!(config.connection.user_id.is_none());
        assert_eq!(config.sampler.source, SamplerSource::Gpsd);
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(config.sync.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.tracking.distance_filter_m = 25.0;
        config.sync.batch_size = 20;
        config.connection.user_id = Some("driver-7".to_string());
        config.sampler.source = SamplerSource::Replay;
        config.sampler.replay_file = Some(temp_dir.path().join("track.jsonl"));
        config.save_to(&config_path).unwrap();

        let loaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(loaded.tracking.distance_filter_m, 25.0);
        assert_eq!(loaded.sync.batch_size, 20);
        assert_eq!(loaded.connection.user_id.as_deref(), Some("driver-7"));
        assert_eq!(loaded.sampler.source, SamplerSource::Replay);
        assert_eq!(
            loaded.sampler.replay_file,
            Some(temp_dir.path().join("track.jsonl"))
        );
    }
}
