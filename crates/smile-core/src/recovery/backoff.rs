//! Backoff strategies for retry operations

use rand::Rng;
use std::time::Duration;

/// Configuration for backoff behavior
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Add random jitter to spread out concurrent retries
    pub jitter: bool,
    /// Maximum jitter ratio (0.0 - 1.0)
    pub jitter_ratio: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: false,
            jitter_ratio: 0.2,
        }
    }
}

impl BackoffConfig {
    /// Create a backoff config with custom initial delay
    pub fn with_initial_delay(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            ..Default::default()
        }
    }

    /// Set the maximum delay
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Enable or disable jitter
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Backoff strategy trait
pub trait BackoffStrategy: Send + Sync {
    /// Get the delay for the given retry number (0-indexed)
    fn delay_for_attempt(&self, attempt: u32) -> Duration;
}

/// `initial_delay * multiplier^attempt`, capped at `max_delay`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
}

impl ExponentialBackoff {
    pub fn with_config(config: BackoffConfig) -> Self {
        Self { config }
    }

    fn add_jitter(&self, delay: Duration) -> Duration {
        if !self.config.jitter || self.config.jitter_ratio <= 0.0 {
            return delay;
        }
        let range = delay.as_secs_f64() * self.config.jitter_ratio;
        let offset = rand::thread_rng().gen_range(-range..=range);
        Duration::from_secs_f64((delay.as_secs_f64() + offset).max(0.0))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::with_config(BackoffConfig::default())
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.config.initial_delay.as_secs_f64()
            * self.config.multiplier.powi(attempt as i32);
        let capped = Duration::from_secs_f64(base.min(self.config.max_delay.as_secs_f64()));
        self.add_jitter(capped)
    }
}
