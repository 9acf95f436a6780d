//! Reconnection decisions.
//!
//! The delay before attempt `n` (starting at 1) is `base * 1.5^(n-1)`.
//! A normal closure (code 1000) never reconnects; anything else does until
//! `max_attempts` is exhausted. A successful connection resets the count.

use std::time::Duration;

/// Close code of an intentional, clean shutdown.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code used for errors and connections that dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Growth factor between consecutive delays.
pub const BACKOFF_FACTOR: f64 = 1.5;

/// What to do after the channel closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Intentional close; stay disconnected.
    Stop,
    /// Wait `delay`, then make attempt number `attempt`.
    Retry { attempt: u32, delay: Duration },
    /// All attempts used up.
    GiveUp { attempts: u32 },
}

/// Tracks reconnect attempts for one supervisor.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_attempts,
            attempts: 0,
        }
    }

    /// Delay before attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        self.base.mul_f64(BACKOFF_FACTOR.powi(exponent))
    }

    /// Decide how to react to a close with the given code.
    pub fn on_close(&mut self, code: u16) -> CloseDecision {
        if code == NORMAL_CLOSURE {
            return CloseDecision::Stop;
        }
        if self.attempts >= self.max_attempts {
            return CloseDecision::GiveUp {
                attempts: self.attempts,
            };
        }
        self.attempts += 1;
        CloseDecision::Retry {
            attempt: self.attempts,
            delay: self.delay(self.attempts),
        }
    }

    /// Record a successful connection.
    pub fn on_connected(&mut self) {
        self.attempts = 0;
    }
}
