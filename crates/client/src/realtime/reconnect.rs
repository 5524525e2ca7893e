//! Fixed-delay, bounded reconnect policy.

use std::time::Duration;

use crate::config::ReconnectConfig;

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempts: u32,
}

impl ReconnectPolicy {
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// A connection opened; the attempt budget starts over.
    pub const fn on_open(&mut self) {
        self.attempts = 0;
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    pub const fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts < self.config.max_attempts {
            self.attempts += 1;
            Some(self.config.delay)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}
