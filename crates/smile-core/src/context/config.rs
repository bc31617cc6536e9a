//! Compilation options and budget arithmetic

use crate::types::ToolDefinition;

/// Tokens held back on top of the completion reservation
pub const DEFAULT_SAFETY_BUFFER: usize = 350;

/// Messages the pruner tries to keep intact before touching recent turns
pub const MIN_RECENT_MESSAGES: usize = 5;

/// Inputs for one compilation pass
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// The model's total token window
    pub context_length: usize,
    /// Tokens reserved for the response
    pub max_tokens: usize,
    /// Whether the target provider accepts image parts
    pub supports_images: bool,
    /// Standalone prompt appended as a trailing user message
    pub prompt: Option<String>,
    /// Tool definitions sent with the request; their JSON is budgeted
    pub tools: Vec<ToolDefinition>,
    /// System message override, combined with any leading system message
    pub system_message: Option<String>,
    pub safety_buffer: usize,
}

impl CompileOptions {
    pub fn new(context_length: usize, max_tokens: usize) -> Self {
        Self {
            context_length,
            max_tokens,
            supports_images: false,
            prompt: None,
            tools: Vec::new(),
            system_message: None,
            safety_buffer: DEFAULT_SAFETY_BUFFER,
        }
    }

    pub fn with_images(mut self, supports_images: bool) -> Self {
        self.supports_images = supports_images;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }

    pub fn with_safety_buffer(mut self, safety_buffer: usize) -> Self {
        self.safety_buffer = safety_buffer;
        self
    }
}

/// Token ceiling for one pass.
///
/// `reserved` covers the completion, the tool definitions and the safety
/// buffer. History fits when `reserved + history <= context_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    pub context_length: usize,
    pub reserved: usize,
}

impl ContextBudget {
    pub fn new(context_length: usize, max_tokens: usize, tool_tokens: usize, safety: usize) -> Self {
        Self {
            context_length,
            reserved: max_tokens + tool_tokens + safety,
        }
    }

    /// Whether any history fits at all
    pub fn has_room(&self) -> bool {
        self.reserved < self.context_length
    }

    /// Tokens available to history
    pub fn history_tokens(&self) -> usize {
        self.context_length.saturating_sub(self.reserved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_reserves_completion_tools_and_buffer() {
        let budget = ContextBudget::new(8096, 4096, 100, DEFAULT_SAFETY_BUFFER);
        assert_eq!(budget.reserved, 4546);
        assert_eq!(budget.history_tokens(), 3550);
        assert!(budget.has_room());
    }

    #[test]
    fn equal_reservation_leaves_no_room() {
        assert!(!ContextBudget::new(1000, 650, 0, 350).has_room());
    }
}
