//! Core error types and traits for Smile

use thiserror::Error;

/// Result type alias for Smile operations
pub type SmileResult<T> = Result<T, SmileError>;

/// Unified error trait implemented by [`SmileError`].
///
/// - error_code(): stable code for programmatic handling
/// - message(): human-readable message
/// - context(): optional extra context
/// - is_retryable(): whether the failure is worth another attempt
pub trait UnifiedError: std::error::Error + Send + Sync {
    /// Get the error code for programmatic handling
    fn error_code(&self) -> &str;

    /// Get the human-readable error message
    fn message(&self) -> &str;

    /// Get optional context about the error
    fn context(&self) -> Option<&str> {
        None
    }

    /// Check if this error is retryable
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<C: std::fmt::Display>(self, context: C) -> SmileResult<T>;

    /// Add context lazily (only evaluated on error)
    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> SmileResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context<C: std::fmt::Display>(self, context: C) -> SmileResult<T> {
        self.map_err(|e| SmileError::other(format!("{}: {}", context, e)))
    }

    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> SmileResult<T> {
        self.map_err(|e| SmileError::other(format!("{}: {}", f(), e)))
    }
}

/// Extension trait for turning an Option into a Result
pub trait OptionExt<T> {
    /// Convert Option to Result with context message
    fn context<C: std::fmt::Display>(self, context: C) -> SmileResult<T>;

    /// Convert Option to Result with lazy context message
    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> SmileResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn context<C: std::fmt::Display>(self, context: C) -> SmileResult<T> {
        self.ok_or_else(|| SmileError::other(context.to_string()))
    }

    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> SmileResult<T> {
        self.ok_or_else(|| SmileError::other(f().to_string()))
    }
}

/// Main error type for Smile
#[derive(Error, Debug, Clone)]
pub enum SmileError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// The completion reservation leaves no room for any conversation history
    #[error(
        "Context length {context_length} leaves no room for history: {reserved} tokens are \
         reserved for the completion, tool definitions and the safety buffer"
    )]
    ContextOverflow {
        context_length: usize,
        reserved: usize,
    },

    /// Provider-level failures that are not plain HTTP errors
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        provider: Option<String>,
        context: Option<String>,
    },

    /// HTTP request errors (non-success status codes)
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        url: Option<String>,
        status_code: Option<u16>,
        context: Option<String>,
    },

    /// Network-level failures: refused connections, resets, DNS
    #[error("Network error: {message}")]
    Network {
        message: String,
        url: Option<String>,
        context: Option<String>,
    },

    /// Request timeout
    #[error("Request timed out after {seconds} seconds")]
    Timeout {
        seconds: u64,
        context: Option<String>,
    },

    /// Request was cancelled by the caller
    #[error("Request was cancelled")]
    Cancelled,

    /// A response is already streaming for this conversation
    #[error("Busy: {message}")]
    Busy { message: String },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
        context: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        context: Option<String>,
    },

    /// Invalid input errors
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
        context: Option<String>,
    },

    /// Storage/persistence errors
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        context: Option<String>,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        resource_type: Option<String>,
        context: Option<String>,
    },

    /// Generic error with context
    #[error("Error: {message}")]
    Other {
        message: String,
        context: Option<String>,
    },
}

impl SmileError {
    /// Whether this error represents an explicit cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status code carried by the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status_code, .. } => *status_code,
            _ => None,
        }
    }
}
