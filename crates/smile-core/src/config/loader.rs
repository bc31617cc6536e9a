//! Layered configuration loading
//!
//! Precedence, lowest to highest: defaults, config file, environment,
//! command-line overrides.

use super::env_loader::{apply_env, load_dotenv};
use super::file_loader::load_from_file;
use super::model::Config;
use crate::error::SmileResult;
use std::path::PathBuf;

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub provider: Option<String>,
    pub context_length: Option<usize>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub system_message: Option<String>,
    pub storage_dir: Option<PathBuf>,
}

impl CliOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(base) = self.api_base {
            config.api_base = Some(base);
        }
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if self.context_length.is_some() {
            config.context_length = self.context_length;
        }
        if self.max_tokens.is_some() {
            config.max_tokens = self.max_tokens;
        }
        if self.temperature.is_some() {
            config.completion.temperature = self.temperature;
        }
        if let Some(system) = self.system_message {
            config.system_message = Some(system);
        }
        if let Some(dir) = self.storage_dir {
            config.storage_dir = Some(dir);
        }
    }
}

/// Configuration loader with layered sources
#[derive(Debug, Default)]
pub struct ConfigLoader {
    file: Option<(PathBuf, bool)>,
    use_env: bool,
    overrides: Option<CliOverrides>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a file the user named; it must exist
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some((path.into(), true));
        self
    }

    /// Read the default config file if it exists
    pub fn with_default_file(mut self) -> Self {
        if let Some(path) = Config::default_path() {
            self.file = Some((path, false));
        }
        self
    }

    /// Apply `.env` and `SMILE_*` variables
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    pub fn with_overrides(mut self, overrides: CliOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Load and validate
    pub fn load(self) -> SmileResult<Config> {
        let mut config = match &self.file {
            Some((path, required)) => {
                tracing::debug!(path = %path.display(), "loading config file");
                load_from_file(path, *required)?
            }
            None => Config::default(),
        };

        if self.use_env {
            load_dotenv();
            apply_env(&mut config)?;
        }
        if let Some(overrides) = self.overrides {
            overrides.apply(&mut config);
        }

        config.validate()?;
        tracing::debug!(model = %config.model, provider = %config.provider, "configuration loaded");
        Ok(config)
    }
}
