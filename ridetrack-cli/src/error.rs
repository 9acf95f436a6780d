//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use ridetrack::config::ConfigFileError;
use ridetrack::sampler::SamplerError;
use ridetrack::store::StoreError;
use ridetrack::tracking::TrackingError;
use ridetrack::transport::TransportError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Config file could not be read or written
    ConfigFile(ConfigFileError),
    /// Local store error
    Store(StoreError),
    /// Location sensor error
    Sampler(SamplerError),
    /// Tracking session error
    Tracking(TrackingError),
    /// Network delivery error
    Transport(TransportError),
    /// Invalid command-line argument
    InvalidArgument(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Sampler(SamplerError::Unsupported(_))
            | CliError::Tracking(TrackingError::Sensor(SamplerError::Unsupported(_))) => {
                eprintln!();
                eprintln!("No location source could be reached. Either:");
                eprintln!("  1. Start gpsd and check sampler.gpsd_addr in config.ini");
                eprintln!("  2. Replay a recorded track: ridetrack track --replay <file>");
            }
            CliError::Sampler(SamplerError::PermissionDenied(_))
            | CliError::Tracking(TrackingError::Sensor(SamplerError::PermissionDenied(_))) => {
                eprintln!();
                eprintln!("Check that your user may access the GPS device or gpsd socket.");
            }
            CliError::Transport(_) => {
                eprintln!();
                eprintln!("Records stay in the local store and are retried on the next flush.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Store(e) => write!(f, "Local store error: {}", e),
            CliError::Sampler(e) => write!(f, "{}", e),
            CliError::Tracking(e) => write!(f, "{}", e),
            CliError::Transport(e) => write!(f, "Delivery failed: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Store(e) => Some(e),
            CliError::Sampler(e) => Some(e),
            CliError::Tracking(e) => Some(e),
            CliError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<SamplerError> for CliError {
    fn from(e: SamplerError) -> Self {
        CliError::Sampler(e)
    }
}

impl From<TrackingError> for CliError {
    fn from(e: TrackingError) -> Self {
        CliError::Tracking(e)
    }
}

impl From<TransportError> for CliError {
    fn from(e: TransportError) -> Self {
        CliError::Transport(e)
    }
}
