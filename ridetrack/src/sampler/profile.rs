//! Sampling profiles: accuracy, timeout and cache age per request.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Named sampling profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    /// 3D fix, 30 s timeout, never answered from cache.
    HighAccuracy,
    /// 3D fix, 30 s timeout, fixes up to 5 s old reused.
    Continuous,
    /// 2D fix is enough, 5 s timeout, fixes up to 60 s old reused.
    Quick,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighAccuracy => "high-accuracy",
            Self::Continuous => "continuous",
            Self::Quick => "quick",
        }
    }

    /// Concrete parameters for this profile.
    pub fn profile(&self) -> SamplingProfile {
        match self {
            Self::HighAccuracy => SamplingProfile {
                high_accuracy: true,
                timeout: Duration::from_secs(30),
                maximum_age: Duration::ZERO,
            },
            Self::Continuous => SamplingProfile {
                high_accuracy: true,
                timeout: Duration::from_secs(30),
                maximum_age: Duration::from_secs(5),
            },
            Self::Quick => SamplingProfile {
                high_accuracy: false,
                timeout: Duration::from_secs(5),
                maximum_age: Duration::from_secs(60),
            },
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high-accuracy" | "high_accuracy" => Ok(Self::HighAccuracy),
            "continuous" => Ok(Self::Continuous),
            "quick" => Ok(Self::Quick),
            other => Err(format!("unknown sampling profile '{}'", other)),
        }
    }
}

/// Parameters of a single position request or watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingProfile {
    /// Require a 3D fix.
    pub high_accuracy: bool,
    /// Give up on a request after this long.
    pub timeout: Duration,
    /// Oldest cached fix that may answer a request. Zero disables the cache.
    pub maximum_age: Duration,
}

impl From<ProfileKind> for SamplingProfile {
    fn from(kind: ProfileKind) -> Self {
        kind.profile()
    }
}
