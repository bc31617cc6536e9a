//! Configuration management commands

use crate::console::CliConsole;
use colored::*;
use smile_core::config::{Config, save_to_file};
use smile_core::error::{SmileError, SmileResult};
use std::path::{Path, PathBuf};

fn target_path(explicit: Option<&Path>) -> SmileResult<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(Config::default_path)
        .ok_or_else(|| SmileError::config("Could not determine a configuration directory; pass --config"))
}

/// Key shown as its last four characters
fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    format!("****{}", key.chars().skip(count - 4).collect::<String>())
}

/// Show the effective configuration
pub fn show(config: &Config, path: Option<&Path>) -> SmileResult<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration");
    if let Ok(path) = target_path(path) {
        let status = if path.exists() { "" } else { " (not found, using defaults)" };
        println!("{} {}{}", "file:".dimmed(), path.display(), status.yellow());
    }

    let mut shown = config.clone();
    shown.api_key = shown.api_key.as_deref().map(mask_key);
    let rendered = toml::to_string_pretty(&shown)
        .map_err(|e| SmileError::config(format!("Failed to render configuration: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

/// Loading already validated `config`; summarize it
pub fn validate(config: &Config) -> SmileResult<()> {
    let console = CliConsole::new(true);
    console.success("Configuration is valid");
    console.info(&format!("Provider: {}", config.provider));
    console.info(&format!("Model: {}", config.model));
    console.info(&format!("API base: {}", config.api_base_or_default()));
    let settings = config.model_settings();
    console.info(&format!(
        "Context length: {}, completion tokens: {}",
        settings.context_length, settings.max_tokens
    ));
    if config.api_key.is_none() {
        console.warn("No API key configured; set SMILE_API_KEY unless your provider needs none");
    }
    Ok(())
}

/// Write a default configuration file
pub fn init(path: Option<&Path>, force: bool) -> SmileResult<()> {
    let console = CliConsole::new(true);
    let path = target_path(path)?;
    if path.exists() && !force {
        return Err(SmileError::config(format!(
            "{} already exists; use --force to overwrite",
            path.display()
        )));
    }

    save_to_file(&Config::default(), &path)?;
    console.success(&format!("Created configuration file: {}", path.display()));
    Ok(())
}
