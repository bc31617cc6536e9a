//! Token pricing for messages, content and tool definitions

use super::tokenizer::{Tokenizer, tokenizer_for_model};
use crate::types::{ChatMessage, MessageContent, MessagePart, ToolDefinition};
use std::sync::Arc;

/// Flat price of an image part, regardless of its size
pub const IMAGE_TOKENS: usize = 85;

/// Framing overhead added to every message
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Prices text, content and messages with a model-specific tokenizer
#[derive(Clone)]
pub struct TokenCounter {
    tokenizer: Arc<dyn Tokenizer>,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("tokenizer", &self.tokenizer.name())
            .finish()
    }
}

impl TokenCounter {
    /// Counter for a specific tokenizer
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Counter for a model, falling back to a conservative vocabulary
    pub fn for_model(model: &str) -> Self {
        Self::new(tokenizer_for_model(model))
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    pub fn count_text(&self, text: &str) -> usize {
        self.tokenizer.count(text)
    }

    /// Text parts are tokenized, images cost [`IMAGE_TOKENS`] each
    pub fn count_content(&self, content: &MessageContent) -> usize {
        match content {
            MessageContent::Text(text) => self.count_text(text),
            MessageContent::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    MessagePart::Text { text } => self.count_text(text),
                    MessagePart::ImageUrl { .. } => IMAGE_TOKENS,
                })
                .sum(),
        }
    }

    /// Content tokens of a message, without framing overhead
    pub fn count_message_content(&self, message: &ChatMessage) -> usize {
        match message {
            ChatMessage::Tool { content, .. } => self.count_text(content),
            other => other
                .content()
                .map(|content| self.count_content(content))
                .unwrap_or(0),
        }
    }

    /// Content tokens plus [`MESSAGE_OVERHEAD_TOKENS`]
    pub fn count_message(&self, message: &ChatMessage) -> usize {
        self.count_message_content(message) + MESSAGE_OVERHEAD_TOKENS
    }

    pub fn count_messages(&self, messages: &[ChatMessage]) -> usize {
        messages.iter().map(|m| self.count_message(m)).sum()
    }

    /// Tool definitions are priced by their JSON encoding
    pub fn count_tools(&self, tools: &[ToolDefinition]) -> usize {
        tools
            .iter()
            .map(|tool| {
                serde_json::to_string(tool)
                    .map(|json| self.count_text(&json))
                    .unwrap_or(0)
            })
            .sum()
    }

    /// Drop the earliest tokens so at most `max_tokens` remain
    pub fn prune_from_top(&self, text: &str, max_tokens: usize) -> String {
        self.tokenizer.keep_last(text, max_tokens)
    }

    /// Drop the latest tokens so at most `max_tokens` remain
    pub fn prune_from_bottom(&self, text: &str, max_tokens: usize) -> String {
        self.tokenizer.keep_first(text, max_tokens)
    }
}

/// Count the tokens of `content` as `model` would see them
pub fn count_tokens(content: &MessageContent, model: &str) -> usize {
    TokenCounter::for_model(model).count_content(content)
}
