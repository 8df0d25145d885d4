//! Reconnection policy for the streaming session.
//!
//! The default is to fail fast: an abnormal transport loss puts the
//! session into an error state and the operator decides what happens
//! next. Opting into [`ReconnectPolicy::Backoff`] makes the session
//! retry the connection with exponentially growing delays instead.

use std::time::Duration;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Give up after this many failed attempts. `0` retries forever.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: 0,
        }
    }
}

/// What the session does when the transport drops abnormally.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReconnectPolicy {
    /// Surface the loss as a session error.
    #[default]
    None,
    /// Retry with exponential backoff.
    Backoff(BackoffConfig),
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`BackoffConfig::max_delay`].
pub fn next_delay(current: Duration, config: &BackoffConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}
