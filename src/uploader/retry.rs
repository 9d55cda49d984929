use std::time::Duration;

use crate::config::Config;

/// Attempt policy for a single file.
///
/// `max_retries` bounds ordinary failures only. Rate-limited responses wait
/// and try again without using up an attempt; `max_rate_limit_waits` is the
/// only bound on those.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub max_rate_limit_waits: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            max_rate_limit_waits: None,
        }
    }
}

impl From<&Config> for RetryConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            max_rate_limit_waits: config.max_rate_limit_waits,
        }
    }
}

impl RetryConfig {
    /// Wait requested by the server, or the regular retry delay.
    pub fn rate_limit_delay(&self, retry_after_secs: Option<u64>) -> Duration {
        retry_after_secs
            .map(Duration::from_secs)
            .unwrap_or(self.retry_delay)
    }

    /// Whether the `waits`-th rate-limit wait for a file is still allowed.
    pub fn allows_rate_limit_wait(&self, waits: u32) -> bool {
        self.max_rate_limit_waits
            .map_or(true, |max| waits <= max)
    }

    /// Whether another ordinary attempt follows `attempts` failed ones.
    pub fn has_attempts_left(&self, attempts: u32) -> bool {
        attempts < self.max_retries
    }
}
