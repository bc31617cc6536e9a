//! Error recovery for provider requests
//!
//! - Error classification (transient vs permanent), driven by error variants
//! - Exponential backoff
//! - A retry decorator that races cancellation against every wait

pub mod backoff;
pub mod retry;

pub use backoff::{BackoffConfig, BackoffStrategy, ExponentialBackoff};
pub use retry::{RetryConfig, RetryPolicy, RetryResult, with_exponential_backoff};

use crate::error::{SmileError, UnifiedError};

/// Error classification for recovery decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// May succeed on retry
    Transient,
    /// Will not succeed on retry
    Permanent,
    /// Retried only when the policy allows unknown errors
    Unknown,
}

/// Classify an error by its kind.
///
/// Cancellation is always permanent so it can never be retried away.
pub fn classify_error(error: &SmileError) -> ErrorClass {
    match error {
        SmileError::Cancelled => ErrorClass::Permanent,
        SmileError::Network { .. } | SmileError::Timeout { .. } => ErrorClass::Transient,
        SmileError::Http { status_code, .. } => match status_code {
            Some(_) if error.is_retryable() => ErrorClass::Transient,
            Some(_) => ErrorClass::Permanent,
            None => ErrorClass::Unknown,
        },
        SmileError::Config { .. }
        | SmileError::ContextOverflow { .. }
        | SmileError::InvalidInput { .. }
        | SmileError::Json { .. }
        | SmileError::NotFound { .. }
        | SmileError::Busy { .. } => ErrorClass::Permanent,
        SmileError::Llm { .. }
        | SmileError::Io { .. }
        | SmileError::Storage { .. }
        | SmileError::Other { .. } => ErrorClass::Unknown,
    }
}
