//! Command routing logic for CLI

use crate::args::{Cli, Commands, ConfigAction, ConversationAction};
use crate::{commands, logging};
use smile_core::config::{CliOverrides, Config, ConfigLoader};
use smile_core::error::SmileResult;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli) -> SmileResult<()> {
    // Writing a fresh file must not depend on the current one being valid
    if let Some(Commands::Config {
        action: ConfigAction::Init { force },
    }) = &cli.command
    {
        return commands::config::init(cli.config.as_deref(), *force);
    }

    let config = load_config(&cli)?;
    logging::init(&config.logging, cli.verbose);
    tracing::debug!(provider = %config.provider, model = %config.model, "configuration loaded");

    match cli.command {
        None => commands::chat::run(&config, None).await,
        Some(Commands::Chat { resume }) => commands::chat::run(&config, resume.as_deref()).await,
        Some(Commands::Ask { prompt, no_save }) => {
            commands::ask::run(&config, &prompt.join(" "), no_save).await
        }
        Some(Commands::Conversations { action }) => match action {
            ConversationAction::List => commands::conversations::list(&config).await,
            ConversationAction::Show { id } => commands::conversations::show(&config, &id).await,
            ConversationAction::Delete { id } => {
                commands::conversations::delete(&config, &id).await
            }
        },
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => commands::config::show(&config, cli.config.as_deref()),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Init { .. } => Ok(()),
        },
    }
}

fn load_config(cli: &Cli) -> SmileResult<Config> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::new().with_file(path),
        None => ConfigLoader::new().with_default_file(),
    };
    loader
        .with_env()
        .with_overrides(CliOverrides::from(cli.overrides.clone()))
        .load()
}
