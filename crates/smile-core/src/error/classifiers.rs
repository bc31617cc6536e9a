//! Error classification functions for user-friendly messages

use super::user_messages::ErrorCategory;

/// Classify configuration errors
pub(super) fn classify_config_error(message: &str) -> (String, Vec<String>) {
    let message_lower = message.to_lowercase();

    if message_lower.contains("not found") || message_lower.contains("missing") {
        (
            "Configuration file not found".to_string(),
            vec![
                "Create a smile_config.json file in the current directory".to_string(),
                "Run 'smile config init' to generate a default configuration".to_string(),
            ],
        )
    } else if message_lower.contains("api_key") || message_lower.contains("api key") {
        (
            "API key configuration issue".to_string(),
            vec![
                "Set SMILE_API_KEY (or OPENAI_API_KEY) in the environment".to_string(),
                "Or add api_key to your configuration file".to_string(),
            ],
        )
    } else if message_lower.contains("parse") || message_lower.contains("invalid") {
        (
            "Invalid configuration".to_string(),
            vec!["Check the syntax of your configuration file".to_string()],
        )
    } else {
        (
            "Configuration error".to_string(),
            vec!["Review your configuration file for issues".to_string()],
        )
    }
}

/// Classify HTTP errors by status code
pub(super) fn classify_http_status(status: Option<u16>) -> (ErrorCategory, String, Vec<String>) {
    match status {
        Some(401) | Some(403) => (
            ErrorCategory::Authentication,
            "The provider rejected the API key".to_string(),
            vec![
                "Check that your API key is correct and has not expired".to_string(),
                "Make sure the key belongs to the configured api_base".to_string(),
            ],
        ),
        Some(404) => (
            ErrorCategory::ResourceUnavailable,
            "Endpoint or model not found".to_string(),
            vec![
                "Check the model name".to_string(),
                "Check that api_base ends with the right path (often '/v1')".to_string(),
            ],
        ),
        Some(429) => (
            ErrorCategory::RateLimit,
            "Rate limit exceeded".to_string(),
            vec!["Wait a moment and try again".to_string()],
        ),
        Some(code) if code >= 500 => (
            ErrorCategory::Network,
            "The provider is having trouble".to_string(),
            vec!["Try again in a few minutes".to_string()],
        ),
        _ => (
            ErrorCategory::Network,
            "Request failed".to_string(),
            vec!["Check the provider's status and your request options".to_string()],
        ),
    }
}
