//! Context compilation: raw history in, budgeted provider-ready list out

use super::config::{CompileOptions, ContextBudget};
use super::flatten::flatten_messages;
use super::pruner::{HistoryPruner, PruneReport};
use super::render::{render_content, render_message};
use crate::error::{SmileError, SmileResult};
use crate::tokens::TokenCounter;
use crate::types::{ChatMessage, MessageContent, MessageRole};

/// Result of a compilation pass
#[derive(Debug, Clone)]
pub struct CompiledContext {
    pub messages: Vec<ChatMessage>,
    pub budget: ContextBudget,
    pub report: PruneReport,
}

/// Turns a conversation into a message list that fits the model's window.
///
/// Compilation is pure: the caller's history is never touched, all pruning
/// happens on a private copy.
#[derive(Debug, Clone)]
pub struct ContextCompiler {
    counter: TokenCounter,
}

impl ContextCompiler {
    pub fn new(counter: TokenCounter) -> Self {
        Self { counter }
    }

    /// Compiler using the tokenizer for `model`
    pub fn for_model(model: &str) -> Self {
        Self::new(TokenCounter::for_model(model))
    }

    pub fn counter(&self) -> &TokenCounter {
        &self.counter
    }

    /// Compile and return only the messages
    pub fn compile(
        &self,
        history: &[ChatMessage],
        options: &CompileOptions,
    ) -> SmileResult<Vec<ChatMessage>> {
        self.compile_with_report(history, options)
            .map(|compiled| compiled.messages)
    }

    pub fn compile_with_report(
        &self,
        history: &[ChatMessage],
        options: &CompileOptions,
    ) -> SmileResult<CompiledContext> {
        let tool_tokens = self.counter.count_tools(&options.tools);
        let budget = ContextBudget::new(
            options.context_length,
            options.max_tokens,
            tool_tokens,
            options.safety_buffer,
        );
        if !budget.has_room() {
            return Err(SmileError::context_overflow(
                budget.context_length,
                budget.reserved,
            ));
        }

        let mut working = filter_history(history);

        if let Some(prompt) = options.prompt.as_deref().filter(|p| !p.is_empty()) {
            working.push(ChatMessage::user(prompt));
        }

        if let Some(system) = combined_system_message(history, options.system_message.as_deref())
        {
            // Second-to-last so the final user turn outlives it during pruning
            let at = working.len().saturating_sub(1);
            working.insert(at, system);
        }

        // Strip before pruning so the pruner prices exactly what is sent
        if !options.supports_images {
            strip_images(&mut working);
        }

        let report = HistoryPruner::new(&self.counter, budget).prune(&mut working);

        promote_system_message(&mut working);

        let messages = flatten_messages(working);
        tracing::debug!(
            input = history.len(),
            output = messages.len(),
            total_tokens = report.total_tokens,
            context_length = budget.context_length,
            "compiled chat context"
        );

        Ok(CompiledContext {
            messages,
            budget,
            report,
        })
    }
}

/// Drop system and empty messages; blank survivors get a single space
fn filter_history(history: &[ChatMessage]) -> Vec<ChatMessage> {
    history
        .iter()
        .filter(|message| message.role() != MessageRole::System && !message.is_empty())
        .cloned()
        .map(|mut message| {
            let blank = match &message {
                ChatMessage::Tool { content, .. } => content.trim().is_empty(),
                other => other.content().is_some_and(MessageContent::is_blank),
            };
            if blank {
                message.set_text(" ".to_string());
            }
            message
        })
        .collect()
}

/// Leading system content, a blank line, then the override
fn combined_system_message(
    history: &[ChatMessage],
    override_message: Option<&str>,
) -> Option<ChatMessage> {
    let leading = history
        .first()
        .filter(|message| message.role() == MessageRole::System);
    let override_message = override_message.filter(|text| !text.trim().is_empty());

    if leading.is_none() && override_message.is_none() {
        return None;
    }

    let mut content = leading.map(render_message).unwrap_or_default();
    if let Some(extra) = override_message {
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        content.push_str(extra);
    }
    if content.trim().is_empty() {
        return None;
    }

    let system = ChatMessage::system(content);
    Some(match leading {
        Some(original) => system.with_id(original.id()),
        None => system,
    })
}

fn promote_system_message(messages: &mut Vec<ChatMessage>) {
    let len = messages.len();
    if len >= 2 && messages[len - 2].role() == MessageRole::System {
        let system = messages.remove(len - 2);
        messages.insert(0, system);
    }
}

fn strip_images(messages: &mut [ChatMessage]) {
    for message in messages.iter_mut() {
        let rendered = match message.content() {
            Some(content @ MessageContent::Parts(_)) => render_content(content),
            _ => continue,
        };
        message.set_text(rendered);
    }
}
