//! File-based configuration loading

use super::model::Config;
use crate::error::{SmileError, SmileResult};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Toml,
    Yaml,
}

impl FileFormat {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Self::Toml,
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Toml => "TOML",
            Self::Yaml => "YAML",
        }
    }
}

/// Load configuration from a file.
///
/// The format follows the extension: `.toml`, `.yaml`/`.yml`, otherwise JSON.
/// A missing file yields defaults unless `required` is set, which is the case
/// for a path the user named explicitly.
pub fn load_from_file(path: &Path, required: bool) -> SmileResult<Config> {
    if !path.exists() {
        if required {
            return Err(SmileError::config_with_context(
                "Config file not found",
                format!("Reading configuration from '{}'", path.display()),
            ));
        }
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        SmileError::config_with_context(
            format!("Failed to read config file: {}", e),
            format!("Reading configuration from '{}'", path.display()),
        )
    })?;

    let format = FileFormat::of(path);
    let parsed = match format {
        FileFormat::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
        FileFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        FileFormat::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| {
        SmileError::config_with_context(
            format!("Failed to parse {} config: {}", format.name(), e),
            format!("Deserializing configuration from '{}'", path.display()),
        )
    })
}

/// Write a configuration file, creating parent directories
pub fn save_to_file(config: &Config, path: &Path) -> SmileResult<()> {
    let content = match FileFormat::of(path) {
        FileFormat::Toml => toml::to_string_pretty(config)
            .map_err(|e| SmileError::config(format!("Failed to serialize TOML config: {}", e)))?,
        FileFormat::Yaml => serde_yaml::to_string(config)?,
        FileFormat::Json => serde_json::to_string_pretty(config)?,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| SmileError::io_with_path(e.to_string(), parent.display().to_string()))?;
    }
    fs::write(path, content)
        .map_err(|e| SmileError::io_with_path(e.to_string(), path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_implicit_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = load_from_file(&dir.path().join("none.toml"), false).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_from_file(&dir.path().join("none.toml"), true).unwrap_err();
        assert!(matches!(err, SmileError::Config { .. }));
    }

    #[test]
    fn loads_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
model = "gpt-4o"
context_length = 32000

[completion]
temperature = 0.2

[retry]
max_attempts = 2
initial_delay = "100ms"
"#,
        )
        .unwrap();

        let config = load_from_file(&path, true).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.context_length, Some(32_000));
        assert_eq!(config.completion.temperature, Some(0.2));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.initial_delay.as_millis(), 100);
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("config.yml");
        fs::write(&yaml, "model: llama3\napi_base: http://localhost:11434/v1\n").unwrap();
        let config = load_from_file(&yaml, true).unwrap();
        assert_eq!(config.model, "llama3");
        assert_eq!(config.api_base.as_deref(), Some("http://localhost:11434/v1"));

        let json = dir.path().join("config.json");
        fs::write(&json, r#"{"persona": "a pirate"}"#).unwrap();
        let config = load_from_file(&json, true).unwrap();
        assert_eq!(config.persona.as_deref(), Some("a pirate"));
    }

    #[test]
    fn malformed_file_names_the_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = ").unwrap();
        let err = load_from_file(&path, true).unwrap_err();
        assert!(err.to_string().contains("TOML"));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            model: "gpt-4o".into(),
            ..Config::default()
        };
        save_to_file(&config, &path).unwrap();
        assert_eq!(load_from_file(&path, true).unwrap(), config);
    }
}
