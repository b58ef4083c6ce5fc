//! Capped exponential backoff for stream reconnection.

use std::time::Duration;

/// Backoff configuration.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Base delay for the first attempt.
    pub base_delay_ms: u64,
    /// Delay ceiling.
    pub max_delay_ms: u64,
    /// Maximum attempts before giving up (0 = infinite).
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 60000,
            max_attempts: 0,
        }
    }
}

/// Attempt counter producing capped exponential delays with jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Delay before the next attempt, or `None` when attempts are
    /// exhausted.
    ///
    /// attempt=1 -> base, attempt=2 -> 2*base, attempt=3 -> 4*base,
    /// capped at `max_delay_ms`.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.config.max_attempts > 0 && self.attempt > self.config.max_attempts {
            return None;
        }

        let exponent = self.attempt.saturating_sub(1).min(10);
        let delay = self
            .config
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.config.max_delay_ms);

        Some(Duration::from_millis(delay + jitter()))
    }

    /// Reset after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

/// Jitter (0-250ms) to spread reconnect storms.
fn jitter() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 250) as u64
}
