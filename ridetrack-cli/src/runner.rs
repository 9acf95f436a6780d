//! CLI runner for common setup and operations.
//!
//! Encapsulates logging initialization, config loading and construction of
//! the pipeline components shared by several commands.

use std::path::PathBuf;

use tracing::{info, warn};

use ridetrack::config::{ConfigFile, SamplerSource};
use ridetrack::connection::ConnectionSupervisor;
use ridetrack::logging::{default_log_file, init_logging_full, LoggingGuard};
use ridetrack::sampler::{GpsdSampler, ReplaySampler};
use ridetrack::store::LocalStore;
use ridetrack::transport::{FallbackTransport, HttpTransport, SocketTransport};

use crate::error::CliError;

/// Channel first, REST when the channel is down.
pub type ClientTransport = FallbackTransport<SocketTransport, HttpTransport>;

/// The location source a command should use.
pub enum SamplerChoice {
    Gpsd(GpsdSampler),
    Replay(ReplaySampler),
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// # Arguments
    ///
    /// * `debug_mode` - When true, enables debug-level logging regardless of RUST_LOG
    /// * `stdout_enabled` - Mirror log output to stdout
    pub fn with_debug(debug_mode: bool, stdout_enabled: bool) -> Result<Self, CliError> {
        // Load config file (or use defaults if not present)
        let config = ConfigFile::load()?;

        let log_path = &config.logging.file;
        let log_dir = log_path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| default_log_file().to_string());

        let logging_guard = init_logging_full(&log_dir, &log_file, stdout_enabled, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("ridetrack v{}", ridetrack::VERSION);
        info!("ridetrack CLI: {} command", command);
    }

    /// Open the configured store, falling back to memory if it cannot be opened.
    pub fn open_store(&self) -> Result<LocalStore, CliError> {
        let path = &self.config.store.path;
        let (store, failure) = LocalStore::open_or_in_memory(path)?;
        if let Some(e) = failure {
            warn!(path = %path.display(), error = %e, "Using in-memory store");
            eprintln!(
                "Warning: cannot open {} ({}); positions will not survive this run",
                path.display(),
                e
            );
        }
        Ok(store)
    }

    /// Open the configured store, failing if it is not durable.
    pub fn open_durable_store(&self) -> Result<LocalStore, CliError> {
        Ok(LocalStore::open(&self.config.store.path)?)
    }

    /// A supervisor for the configured channel. Not started.
    pub fn connection(&self) -> ConnectionSupervisor {
        ConnectionSupervisor::new(self.config.supervisor_config())
    }

    /// Client transport over the given supervisor's channel.
    pub fn transport(&self, supervisor: &ConnectionSupervisor) -> Result<ClientTransport, CliError> {
        Ok(FallbackTransport::new(
            SocketTransport::new(supervisor.handle()),
            self.http()?,
        ))
    }

    /// REST transport alone.
    pub fn http(&self) -> Result<HttpTransport, CliError> {
        Ok(HttpTransport::new(self.config.http_config())?)
    }

    /// Pick the location source: an explicit replay file wins over config.
    pub fn sampler(
        &self,
        replay: Option<PathBuf>,
        speed: Option<f64>,
    ) -> Result<SamplerChoice, CliError> {
        let sampler = &self.config.sampler;
        let replay = match (replay, sampler.source) {
            (Some(path), _) => Some(path),
            (None, SamplerSource::Replay) => Some(sampler.replay_file.clone().ok_or_else(|| {
                CliError::Config(
                    "sampler.source is 'replay' but sampler.replay_file is not set".to_string(),
                )
            })?),
            (None, SamplerSource::Gpsd) => None,
        };

        Ok(match replay {
            Some(path) => SamplerChoice::Replay(
                ReplaySampler::from_file(&path)?
                    .with_speed(speed.unwrap_or(sampler.replay_speed))
                    .with_rebased_timestamps(true),
            ),
            None => SamplerChoice::Gpsd(GpsdSampler::new(sampler.gpsd_addr.clone())),
        })
    }
}
