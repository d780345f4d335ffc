//! Fixed-delay reconnection logic.

use std::time::Duration;

use backon::BackoffBuilder;

/// Default delay between connection checks.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Configuration for the reconnect supervisor.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Fixed delay between connection checks.
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ReconnectConfig {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Unlimited constant backoff, one item per supervisor tick.
    pub fn backoff(&self) -> impl Iterator<Item = Duration> {
        backon::ConstantBuilder::default()
            .with_delay(self.delay)
            .without_max_times()
            .build()
    }
}

/// Tracks consecutive reconnect failures for one endpoint.
#[derive(Debug, Default)]
pub struct ReconnectState {
    attempts: u32,
}

impl ReconnectState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed attempt and return the running count.
    pub fn record_failure(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Reset state after successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Get current attempt count.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
