//! Configuration validation

use super::model::Config;
use crate::error::{SmileError, SmileResult};
use reqwest::Url;

/// Providers served by the OpenAI-compatible client
pub const SUPPORTED_PROVIDERS: [&str; 7] = [
    "openai", "azure", "ollama", "groq", "deepseek", "mistral", "lmstudio",
];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a complete configuration
    pub fn validate(config: &Config) -> SmileResult<()> {
        Self::validate_provider(config)?;
        Self::validate_model(config)?;
        Self::validate_sampling(config)?;
        Self::validate_limits(config)?;
        Ok(())
    }

    fn validate_provider(config: &Config) -> SmileResult<()> {
        let provider = config.provider.to_ascii_lowercase();
        if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            return Err(SmileError::config(format!(
                "Unknown provider '{}'. Valid providers are: {}",
                config.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }

        if let Some(base) = &config.api_base {
            let url = Url::parse(base).map_err(|e| {
                SmileError::config(format!("api_base '{}' is not a valid URL: {}", base, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(SmileError::config(format!(
                    "api_base must use http or https, got '{}'",
                    url.scheme()
                )));
            }
        }
        Ok(())
    }

    fn validate_model(config: &Config) -> SmileResult<()> {
        if config.model.trim().is_empty() {
            return Err(SmileError::config("Model name cannot be empty"));
        }
        Ok(())
    }

    fn validate_sampling(config: &Config) -> SmileResult<()> {
        if let Some(temp) = config.completion.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err(SmileError::config(format!(
                    "Temperature must be between 0.0 and 2.0, got {}",
                    temp
                )));
            }
        }
        if let Some(top_p) = config.completion.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(SmileError::config(format!(
                    "top_p must be between 0.0 and 1.0, got {}",
                    top_p
                )));
            }
        }
        Ok(())
    }

    fn validate_limits(config: &Config) -> SmileResult<()> {
        if config.retry.max_attempts == 0 {
            return Err(SmileError::config("retry.max_attempts must be at least 1"));
        }
        if config.context_length == Some(0) {
            return Err(SmileError::config("context_length must be greater than 0"));
        }
        if config.max_tokens == Some(0) {
            return Err(SmileError::config("max_tokens must be greater than 0"));
        }
        Ok(())
    }
}

impl Config {
    /// Validate this configuration
    pub fn validate(&self) -> SmileResult<()> {
        ConfigValidator::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_model() {
        let config = Config {
            model: "  ".into(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_sampling() {
        let mut config = Config::default();
        config.completion.temperature = Some(2.5);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.completion.top_p = Some(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_retry_attempts() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_api_base() {
        let config = Config {
            api_base: Some("not a url".into()),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            api_base: Some("ftp://example.com".into()),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            api_base: Some("http://localhost:11434/v1".into()),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_provider() {
        let config = Config {
            provider: "carrier-pigeon".into(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
