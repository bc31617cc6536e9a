//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use smile_core::config::CliOverrides;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "smile")]
#[command(about = "Smile - chat with OpenAI-compatible language models")]
#[command(
    long_about = r#"Smile - chat with OpenAI-compatible language models

USAGE:
  smile                          # Start interactive chat
  smile chat -r <id>             # Resume a saved conversation
  smile ask "your question"      # One-shot answer
  smile conversations list       # Saved conversations
  smile config init              # Create config file"#
)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (defaults to the user config directory)
    #[arg(long, short = 'c', global = true, env = "SMILE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Per-invocation configuration overrides
#[derive(clap::Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// Model to use
    #[arg(long, short = 'm', global = true)]
    pub model: Option<String>,

    /// Provider name (openai, azure, ollama, ...)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Context window size in tokens
    #[arg(long, global = true)]
    pub context_length: Option<usize>,

    /// Tokens reserved for the completion
    #[arg(long, global = true)]
    pub max_tokens: Option<usize>,

    /// Sampling temperature
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Extra system message prepended to every request
    #[arg(long, global = true)]
    pub system_message: Option<String>,

    /// Directory for saved conversations
    #[arg(long, global = true)]
    pub storage_dir: Option<PathBuf>,
}

impl From<OverrideArgs> for CliOverrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            model: args.model,
            api_base: args.api_base,
            provider: args.provider,
            context_length: args.context_length,
            max_tokens: args.max_tokens,
            temperature: args.temperature,
            system_message: args.system_message,
            storage_dir: args.storage_dir,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive chat (the default)
    Chat {
        /// Resume the conversation with this id
        #[arg(long, short = 'r')]
        resume: Option<String>,
    },

    /// Answer a single question and exit
    Ask {
        /// The question; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,

        /// Do not save the exchange
        #[arg(long)]
        no_save: bool,
    },

    /// Manage saved conversations
    Conversations {
        #[command(subcommand)]
        action: ConversationAction,
    },

    /// Manage configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConversationAction {
    /// List saved conversations, most recent first
    List,

    /// Print a conversation
    Show { id: String },

    /// Delete a conversation
    Delete { id: String },
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Display the effective configuration
    Show,

    /// Validate the configuration
    Validate,

    /// Create a new configuration file with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_chat() {
        let cli = Cli::try_parse_from(["smile"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn overrides_are_global() {
        let cli = Cli::try_parse_from(["smile", "ask", "hi", "there", "--model", "gpt-4o"]).unwrap();
        assert_eq!(cli.overrides.model.as_deref(), Some("gpt-4o"));
        match cli.command {
            Some(Commands::Ask { prompt, no_save }) => {
                assert_eq!(prompt, vec!["hi", "there"]);
                assert!(!no_save);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn override_args_convert() {
        let args = OverrideArgs {
            temperature: Some(0.2),
            ..Default::default()
        };
        let overrides = CliOverrides::from(args);
        assert_eq!(overrides.temperature, Some(0.2));
        assert!(overrides.model.is_none());
    }
}
