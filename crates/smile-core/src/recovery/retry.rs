//! Retry decorator for fallible async operations
//!
//! Only errors classified as transient are retried. A cancellation token,
//! when given, is raced against both the operation and every backoff sleep,
//! so an abort never waits out a delay and is never retried.

use super::backoff::{BackoffConfig, BackoffStrategy, ExponentialBackoff};
use super::{ErrorClass, classify_error};
use crate::error::{SmileError, SmileResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Retry and backoff settings
///
/// # Example
/// ```
/// use smile_core::recovery::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_max_attempts(3)
///     .with_initial_delay(Duration::from_millis(200));
/// assert_eq!(config.max_attempts, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Maximum delay between retries
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
    /// Whether errors of unknown class are retried
    pub retry_unknown: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: false,
            retry_unknown: false,
        }
    }
}

impl RetryConfig {
    /// A config that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn to_backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.backoff_multiplier,
            jitter: self.jitter,
            jitter_ratio: 0.2,
        }
    }
}

/// Outcome of a retried operation
#[derive(Debug)]
pub enum RetryResult<T> {
    /// Operation succeeded
    Success(T),
    /// Operation failed permanently or ran out of attempts
    Failed {
        error: SmileError,
        attempts: u32,
        elapsed: Duration,
    },
    /// The cancellation token fired
    Cancelled,
}

impl<T> RetryResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Collapse into a result; cancellation becomes [`SmileError::Cancelled`]
    pub fn into_result(self) -> SmileResult<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failed { error, .. } => Err(error),
            Self::Cancelled => Err(SmileError::Cancelled),
        }
    }
}

/// Retry policy for operations
pub struct RetryPolicy {
    config: RetryConfig,
    backoff: Box<dyn BackoffStrategy>,
}

impl RetryPolicy {
    pub fn with_config(config: RetryConfig) -> Self {
        let backoff = ExponentialBackoff::with_config(config.to_backoff_config());
        Self {
            config,
            backoff: Box::new(backoff),
        }
    }

    /// Replace the backoff strategy
    pub fn with_backoff<B: BackoffStrategy + 'static>(mut self, backoff: B) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    /// Whether a failure on `attempt` (0-indexed) earns another try
    pub fn should_retry(&self, error: &SmileError, attempt: u32) -> bool {
        if attempt + 1 >= self.config.max_attempts {
            return false;
        }
        match classify_error(error) {
            ErrorClass::Transient => true,
            ErrorClass::Permanent => false,
            ErrorClass::Unknown => self.config.retry_unknown,
        }
    }

    /// Run `operation` until it succeeds, fails permanently, runs out of
    /// attempts or is cancelled.
    pub async fn execute<T, F, Fut>(
        &self,
        mut operation: F,
        cancel_token: Option<CancellationToken>,
    ) -> RetryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SmileResult<T>>,
    {
        let start = std::time::Instant::now();
        let mut attempt = 0;

        loop {
            let outcome = match &cancel_token {
                Some(token) => {
                    if token.is_cancelled() {
                        return RetryResult::Cancelled;
                    }
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return RetryResult::Cancelled,
                        outcome = operation() => outcome,
                    }
                }
                None => operation().await,
            };

            let error = match outcome {
                Ok(value) => return RetryResult::Success(value),
                Err(error) if error.is_cancelled() => return RetryResult::Cancelled,
                Err(error) => error,
            };

            if !self.should_retry(&error, attempt) {
                if attempt > 0 {
                    tracing::error!(attempts = attempt + 1, error = %error, "giving up after retries");
                }
                return RetryResult::Failed {
                    error,
                    attempts: attempt + 1,
                    elapsed: start.elapsed(),
                };
            }

            let delay = self.backoff.delay_for_attempt(attempt);
            attempt += 1;
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "transient failure, retrying"
            );

            match &cancel_token {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return RetryResult::Cancelled,
                        _ = sleep(delay) => {}
                    }
                }
                None => sleep(delay).await,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_config(RetryConfig::default())
    }
}

/// Retry `operation` with exponential backoff starting at `base_delay`.
///
/// Cancellation surfaces as [`SmileError::Cancelled`] without further attempts.
pub async fn with_exponential_backoff<T, F, Fut>(
    operation: F,
    max_attempts: u32,
    base_delay: Duration,
    cancel_token: Option<CancellationToken>,
) -> SmileResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SmileResult<T>>,
{
    let config = RetryConfig::default()
        .with_max_attempts(max_attempts)
        .with_initial_delay(base_delay);
    RetryPolicy::with_config(config)
        .execute(operation, cancel_token)
        .await
        .into_result()
}
