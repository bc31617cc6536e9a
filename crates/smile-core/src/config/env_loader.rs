//! Environment variable overrides
//!
//! `SMILE_*` variables override values from the config file. The API key also
//! falls back to `OPENAI_API_KEY`.

use super::model::Config;
use crate::error::{SmileError, SmileResult};
use std::path::PathBuf;

pub const ENV_API_KEY: &str = "SMILE_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "SMILE_MODEL";
pub const ENV_API_BASE: &str = "SMILE_API_BASE";
pub const ENV_PROVIDER: &str = "SMILE_PROVIDER";
pub const ENV_CONTEXT_LENGTH: &str = "SMILE_CONTEXT_LENGTH";
pub const ENV_STORAGE_DIR: &str = "SMILE_STORAGE_DIR";
pub const ENV_LOG_LEVEL: &str = "SMILE_LOG_LEVEL";

/// Load `.env` from the working directory or its parents, if present
pub fn load_dotenv() {
    if let Ok(path) = dotenv::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env file");
    }
}

/// Apply overrides from the process environment
pub fn apply_env(config: &mut Config) -> SmileResult<()> {
    apply_env_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides read through `lookup`; empty values are ignored
pub fn apply_env_from<F>(config: &mut Config, lookup: F) -> SmileResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(key) = get(ENV_API_KEY).or_else(|| get(ENV_OPENAI_API_KEY)) {
        config.api_key = Some(key);
    }
    if let Some(model) = get(ENV_MODEL) {
        config.model = model;
    }
    if let Some(base) = get(ENV_API_BASE) {
        config.api_base = Some(base);
    }
    if let Some(provider) = get(ENV_PROVIDER) {
        config.provider = provider;
    }
    if let Some(raw) = get(ENV_CONTEXT_LENGTH) {
        let length = raw.trim().parse::<usize>().map_err(|_| {
            SmileError::config(format!("Invalid {} value: {}", ENV_CONTEXT_LENGTH, raw))
        })?;
        config.context_length = Some(length);
    }
    if let Some(dir) = get(ENV_STORAGE_DIR) {
        config.storage_dir = Some(PathBuf::from(dir));
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
    Ok(())
}
