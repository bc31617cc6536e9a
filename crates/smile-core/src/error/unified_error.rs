//! UnifiedError trait implementation for SmileError

use super::types::{SmileError, UnifiedError};

impl UnifiedError for SmileError {
    fn error_code(&self) -> &str {
        match self {
            Self::Config { .. } => "SMILE_CONFIG",
            Self::ContextOverflow { .. } => "SMILE_CONTEXT_OVERFLOW",
            Self::Llm { .. } => "SMILE_LLM",
            Self::Http { .. } => "SMILE_HTTP",
            Self::Network { .. } => "SMILE_NETWORK",
            Self::Timeout { .. } => "SMILE_TIMEOUT",
            Self::Cancelled => "SMILE_CANCELLED",
            Self::Busy { .. } => "SMILE_BUSY",
            Self::Io { .. } => "SMILE_IO",
            Self::Json { .. } => "SMILE_JSON",
            Self::InvalidInput { .. } => "SMILE_INVALID_INPUT",
            Self::Storage { .. } => "SMILE_STORAGE",
            Self::NotFound { .. } => "SMILE_NOT_FOUND",
            Self::Other { .. } => "SMILE_OTHER",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Config { message, .. } => message,
            Self::ContextOverflow { .. } => "Context length too small for the requested completion",
            Self::Llm { message, .. } => message,
            Self::Http { message, .. } => message,
            Self::Network { message, .. } => message,
            Self::Timeout { .. } => "Request timed out",
            Self::Cancelled => "Request was cancelled",
            Self::Busy { message } => message,
            Self::Io { message, .. } => message,
            Self::Json { message, .. } => message,
            Self::InvalidInput { message, .. } => message,
            Self::Storage { message, .. } => message,
            Self::NotFound { message, .. } => message,
            Self::Other { message, .. } => message,
        }
    }

    fn context(&self) -> Option<&str> {
        match self {
            Self::Config { context, .. }
            | Self::Llm { context, .. }
            | Self::Http { context, .. }
            | Self::Network { context, .. }
            | Self::Timeout { context, .. }
            | Self::Io { context, .. }
            | Self::Json { context, .. }
            | Self::InvalidInput { context, .. }
            | Self::Storage { context, .. }
            | Self::NotFound { context, .. }
            | Self::Other { context, .. } => context.as_deref(),
            Self::ContextOverflow { .. } | Self::Cancelled | Self::Busy { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Http { status_code, .. } => status_code.is_some_and(is_transient_status),
            _ => false,
        }
    }
}

/// Status codes worth retrying: request timeout, conflict, too early, rate limit, server errors
pub(crate) fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 425 | 429) || (500..=599).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_never_retryable() {
        assert!(!SmileError::Cancelled.is_retryable());
        assert_eq!(SmileError::Cancelled.error_code(), "SMILE_CANCELLED");
    }

    #[test]
    fn http_retryability_follows_status() {
        let rate_limited = SmileError::http_status("slow down", "https://x", 429);
        let unauthorized = SmileError::http_status("bad key", "https://x", 401);
        let bad_gateway = SmileError::http_status("upstream", "https://x", 502);

        assert!(rate_limited.is_retryable());
        assert!(!unauthorized.is_retryable());
        assert!(bad_gateway.is_retryable());
    }

    #[test]
    fn network_and_timeout_are_retryable() {
        assert!(SmileError::network("connection refused").is_retryable());
        assert!(SmileError::timeout(30).is_retryable());
        assert!(!SmileError::context_overflow(100, 400).is_retryable());
    }
}
