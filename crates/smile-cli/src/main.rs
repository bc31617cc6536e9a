//! Smile CLI application
//!
//! Chat with OpenAI-compatible models from the terminal.
//!
//! ```bash
//! cargo install --path crates/smile-cli
//! ```
//!
//! - `smile` or `smile chat` starts the interactive chat loop
//! - `smile chat -r <id>` resumes a saved conversation
//! - `smile ask "question"` answers once and exits
//! - `smile conversations` and `smile config` manage saved state

mod args;
mod commands;
mod console;
mod logging;
mod router;
mod signal_handler;

use clap::Parser;
use console::CliConsole;
use smile_core::error::SmileResult;

pub use args::{Cli, Commands, ConfigAction, ConversationAction};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        CliConsole::new(false).error_friendly(&error);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> SmileResult<()> {
    router::route(cli).await
}
