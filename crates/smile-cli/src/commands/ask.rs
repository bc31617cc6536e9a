//! One-shot question

use super::chat::{Turn, stream_answer};
use crate::console::CliConsole;
use crate::signal_handler::SignalHandler;
use colored::*;
use smile_core::chat::ChatSession;
use smile_core::config::Config;
use smile_core::error::{SmileError, SmileResult};
use smile_core::llm::StreamOutcome;
use smile_core::storage::{ConversationStore, MemoryConversationStore};
use std::sync::Arc;

pub async fn run(config: &Config, prompt: &str, no_save: bool) -> SmileResult<()> {
    let console = CliConsole::new(false);
    let store: Arc<dyn ConversationStore> = if no_save {
        Arc::new(MemoryConversationStore::new())
    } else {
        super::file_store(config)
    };
    let session = ChatSession::new(
        super::orchestrator(config)?,
        store,
        super::prompt_settings(config),
    );

    let mut signals = SignalHandler::new();
    signals.start()?;
    let outcome = stream_answer(&session, &signals, &console, Turn::Submit(prompt)).await;
    signals.stop();

    match outcome? {
        StreamOutcome::Completed { .. } => {
            if !no_save {
                eprintln!("{}", format!("conversation {}", session.conversation_id()).dimmed());
            }
            Ok(())
        }
        StreamOutcome::Cancelled { .. } => Err(SmileError::Cancelled),
    }
}
