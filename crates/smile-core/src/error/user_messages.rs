//! User-friendly error messages and classification
//!
//! Turns a [`SmileError`] into a title, a message and suggested actions for
//! display in the CLI.

use super::classifiers::{classify_config_error, classify_http_status};
use super::types::{SmileError, UnifiedError};

/// Error category for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration issues
    Configuration,
    /// Authentication/authorization failures
    Authentication,
    /// Rate limiting / quota exceeded
    RateLimit,
    /// Network connectivity issues
    Network,
    /// Invalid user input
    UserInput,
    /// Internal system errors
    Internal,
    /// Resource not available
    ResourceUnavailable,
    /// User-initiated cancellation
    Cancellation,
    /// File system related errors
    FileSystem,
}

impl ErrorCategory {
    /// Get a user-friendly category name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration Error",
            Self::Authentication => "Authentication Error",
            Self::RateLimit => "Rate Limit Exceeded",
            Self::Network => "Network Error",
            Self::UserInput => "Invalid Input",
            Self::Internal => "Internal Error",
            Self::ResourceUnavailable => "Resource Unavailable",
            Self::Cancellation => "Cancelled",
            Self::FileSystem => "File System Error",
        }
    }
}

/// User-friendly error information
#[derive(Debug, Clone)]
pub struct UserFriendlyError {
    /// The error category
    pub category: ErrorCategory,
    /// User-friendly title/summary
    pub title: String,
    /// Detailed user-friendly message
    pub message: String,
    /// Suggested actions to resolve the error
    pub suggestions: Vec<String>,
    /// Original technical error code
    pub error_code: String,
}

impl UserFriendlyError {
    /// Create a new user-friendly error
    pub fn new(
        category: ErrorCategory,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            title: title.into(),
            message: message.into(),
            suggestions: Vec::new(),
            error_code: String::new(),
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add multiple suggestions
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions.extend(suggestions);
        self
    }

    /// Set the technical error code
    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = code.into();
        self
    }

    /// Format the error for display
    pub fn format_display(&self) -> String {
        let mut output = format!(
            "{}: {}\n\n{}",
            self.category.display_name(),
            self.title,
            self.message
        );

        if !self.suggestions.is_empty() {
            output.push_str("\n\nSuggested actions:");
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("\n  {}. {}", i + 1, suggestion));
            }
        }

        output
    }
}

impl From<&SmileError> for UserFriendlyError {
    fn from(error: &SmileError) -> Self {
        let code = error.error_code().to_string();
        let friendly = match error {
            SmileError::Config { message, .. } => {
                let (title, suggestions) = classify_config_error(message);
                UserFriendlyError::new(ErrorCategory::Configuration, title, message.clone())
                    .with_suggestions(suggestions)
            }
            SmileError::ContextOverflow { .. } => UserFriendlyError::new(
                ErrorCategory::Configuration,
                "Context window too small",
                error.to_string(),
            )
            .with_suggestion("Lower max_tokens or raise context_length in your configuration"),
            SmileError::Http {
                message,
                status_code,
                ..
            } => {
                let (category, title, suggestions) = classify_http_status(*status_code);
                UserFriendlyError::new(category, title, message.clone())
                    .with_suggestions(suggestions)
            }
            SmileError::Network { message, .. } => UserFriendlyError::new(
                ErrorCategory::Network,
                "Could not reach the provider",
                message.clone(),
            )
            .with_suggestion("Check your network connection and api_base"),
            SmileError::Timeout { seconds, .. } => UserFriendlyError::new(
                ErrorCategory::Network,
                "Request timed out",
                format!("No response after {} seconds", seconds),
            )
            .with_suggestion("Raise request.timeout_secs in your configuration"),
            SmileError::Llm {
                message, provider, ..
            } => UserFriendlyError::new(
                ErrorCategory::Network,
                format!("{} request failed", provider.as_deref().unwrap_or("Provider")),
                message.clone(),
            ),
            SmileError::Cancelled => UserFriendlyError::new(
                ErrorCategory::Cancellation,
                "Cancelled",
                "The response was stopped before it finished",
            ),
            SmileError::Busy { message } => UserFriendlyError::new(
                ErrorCategory::UserInput,
                "A response is still streaming",
                message.clone(),
            )
            .with_suggestion("Wait for the current response or press Ctrl+C to stop it"),
            SmileError::InvalidInput { message, .. } => {
                UserFriendlyError::new(ErrorCategory::UserInput, "Invalid input", message.clone())
            }
            SmileError::Io { message, path, .. } => UserFriendlyError::new(
                ErrorCategory::FileSystem,
                match path {
                    Some(p) => format!("File operation failed on {}", p),
                    None => "File operation failed".to_string(),
                },
                message.clone(),
            ),
            SmileError::NotFound { message, .. } => UserFriendlyError::new(
                ErrorCategory::ResourceUnavailable,
                "Not found",
                message.clone(),
            ),
            SmileError::Storage { message, .. } => UserFriendlyError::new(
                ErrorCategory::FileSystem,
                "Could not save the conversation",
                message.clone(),
            ),
            SmileError::Json { message, .. } | SmileError::Other { message, .. } => {
                UserFriendlyError::new(ErrorCategory::Internal, "Unexpected error", message.clone())
            }
        };
        friendly.with_error_code(code)
    }
}
