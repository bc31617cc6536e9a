//! CLI command implementations

pub mod ask;
pub mod chat;
pub mod config;
pub mod conversations;

use smile_core::chat::PromptSettings;
use smile_core::config::Config;
use smile_core::error::SmileResult;
use smile_core::llm::ChatOrchestrator;
use smile_core::storage::{ConversationStore, FileConversationStore};
use std::io::Write;
use std::sync::Arc;

pub(crate) fn orchestrator(config: &Config) -> SmileResult<Arc<ChatOrchestrator>> {
    Ok(Arc::new(ChatOrchestrator::from_config(config)?))
}

pub(crate) fn file_store(config: &Config) -> Arc<dyn ConversationStore> {
    Arc::new(FileConversationStore::new(config.storage_dir_or_default()))
}

pub(crate) fn prompt_settings(config: &Config) -> PromptSettings {
    PromptSettings::new(config.persona.clone(), config.custom_instructions.clone())
        .with_markdown(config.use_markdown)
}

/// Prints only the part of a growing answer not yet on screen
#[derive(Debug, Default)]
pub(crate) struct IncrementalPrinter {
    printed: usize,
}

impl IncrementalPrinter {
    pub fn update(&mut self, text: &str) {
        if let Some(fresh) = text.get(self.printed..) {
            print!("{}", fresh);
            let _ = std::io::stdout().flush();
        }
        self.printed = text.len();
    }

    pub fn has_output(&self) -> bool {
        self.printed > 0
    }
}
