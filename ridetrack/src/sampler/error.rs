//! Error types for location sources.

use std::time::Duration;
use thiserror::Error;

/// Errors reported by a [`GeoSampler`](super::GeoSampler).
///
/// Samplers report these and never retry on their own.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SamplerError {
    /// No location source is reachable on this host.
    #[error("Location source unsupported: {0}")]
    Unsupported(String),

    /// The source refused access.
    #[error("Location permission denied: {0}")]
    PermissionDenied(String),

    /// The source is up but has no usable fix.
    #[error("Position unavailable: {0}")]
    Unavailable(String),

    /// No fix arrived within the profile timeout.
    #[error("Timed out after {0:?} waiting for a position")]
    Timeout(Duration),
}

/// Payload-free classification of [`SamplerError`], used in events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerErrorKind {
    Unsupported,
    PermissionDenied,
    Unavailable,
    Timeout,
}

impl SamplerError {
    pub fn kind(&self) -> SamplerErrorKind {
        match self {
            Self::Unsupported(_) => SamplerErrorKind::Unsupported,
            Self::PermissionDenied(_) => SamplerErrorKind::PermissionDenied,
            Self::Unavailable(_) => SamplerErrorKind::Unavailable,
            Self::Timeout(_) => SamplerErrorKind::Timeout,
        }
    }

    /// Whether this error should keep a session from starting.
    pub fn blocks_start(&self) -> bool {
        matches!(self, Self::Unsupported(_) | Self::PermissionDenied(_))
    }

    /// Classify an I/O error from talking to a location daemon.
    pub(crate) fn from_io(addr: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound => {
                Self::Unsupported(format!("no location daemon at {}: {}", addr, err))
            }
            std::io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(format!("{}: {}", addr, err))
            }
            _ => Self::Unavailable(format!("{}: {}", addr, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_mapping() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(
            SamplerError::from_io("127.0.0.1:2947", &refused).kind(),
            SamplerErrorKind::Unsupported
        );

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            SamplerError::from_io("127.0.0.1:2947", &denied).kind(),
            SamplerErrorKind::PermissionDenied
        );

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(
            SamplerError::from_io("127.0.0.1:2947", &reset).kind(),
            SamplerErrorKind::Unavailable
        );
    }

    #[test]
    fn test_blocks_start() {
        assert!(SamplerError::PermissionDenied("x".into()).blocks_start());
        assert!(SamplerError::Unsupported("x".into()).blocks_start());
        assert!(!SamplerError::Timeout(std::time::Duration::from_secs(1)).blocks_start());
    }
}
