//! Configuration model

use super::logging_config::LoggingConfig;
use super::request_options::RequestOptions;
use crate::llm::model_info::{DEFAULT_TEMPERATURE, ModelSettings};
use crate::recovery::RetryConfig;
use crate::types::CompletionOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "o3-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1/";

fn default_temperature() -> Option<f32> {
    Some(DEFAULT_TEMPERATURE)
}

fn default_true() -> bool {
    true
}

/// Sampling defaults applied to every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionDefaults {
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub frequency_penalty: Option<f32>,
    #[serde(default)]
    pub presence_penalty: Option<f32>,
    #[serde(default)]
    pub stop: Vec<String>,
    #[serde(default = "default_true")]
    pub stream: bool,
}

impl Default for CompletionDefaults {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            stop: Vec::new(),
            stream: true,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    /// Overrides the model table
    pub context_length: Option<usize>,
    /// Overrides the derived response reservation
    pub max_tokens: Option<usize>,
    pub completion: CompletionDefaults,
    /// Operator system message appended to the conversation's own
    pub system_message: Option<String>,
    pub persona: Option<String>,
    pub custom_instructions: Option<String>,
    pub use_markdown: bool,
    pub request: RequestOptions,
    pub retry: RetryConfig,
    pub storage_dir: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_base: None,
            context_length: None,
            max_tokens: None,
            completion: CompletionDefaults::default(),
            system_message: None,
            persona: None,
            custom_instructions: None,
            use_markdown: true,
            request: RequestOptions::default(),
            retry: RetryConfig::default(),
            storage_dir: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Budget settings for the configured model
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings::resolve(&self.model, self.context_length, self.max_tokens)
    }

    /// Request defaults derived from this config
    pub fn completion_options(&self) -> CompletionOptions {
        let settings = self.model_settings();
        let mut options = CompletionOptions::new(&self.model)
            .with_max_tokens(settings.max_tokens)
            .with_stop(self.completion.stop.clone())
            .with_stream(self.completion.stream);
        options.temperature = self.completion.temperature;
        options.top_p = self.completion.top_p;
        options.frequency_penalty = self.completion.frequency_penalty;
        options.presence_penalty = self.completion.presence_penalty;
        options
    }

    pub fn api_base_or_default(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn is_azure(&self) -> bool {
        self.provider.eq_ignore_ascii_case("azure")
    }

    /// Where conversations are written
    pub fn storage_dir_or_default(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("smile")
                .join("conversations")
        })
    }

    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("smile").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "o3-mini");
        assert_eq!(config.completion.temperature, Some(0.5));
        assert!(config.completion.stream);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.api_base_or_default(), DEFAULT_API_BASE);
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"model": "gpt-4o", "completion": {"top_p": 0.9}}"#).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.completion.temperature, Some(0.5));
        assert_eq!(config.completion.top_p, Some(0.9));
        assert_eq!(config.provider, "openai");
    }

    #[test]
    fn completion_options_carry_resolved_limits() {
        let config = Config {
            model: "gpt-4o".into(),
            ..Config::default()
        };
        let options = config.completion_options();
        assert_eq!(options.model, "gpt-4o");
        assert_eq!(options.max_tokens, Some(16_384));
        assert_eq!(options.temperature, Some(0.5));
    }

    #[test]
    fn explicit_limits_override_table() {
        let config = Config {
            model: "gpt-4o".into(),
            context_length: Some(4_000),
            max_tokens: Some(500),
            ..Config::default()
        };
        let settings = config.model_settings();
        assert_eq!(settings.context_length, 4_000);
        assert_eq!(settings.max_tokens, 500);
    }
}
