//! Shared data types for Smile
//!
//! The message model is a closed sum type over roles, so a tool result can
//! never carry tool calls and a system prompt can never name a tool call id.

mod message;
mod options;

pub use message::{
    ChatMessage, FunctionCall, ImageUrl, MessageContent, MessagePart, MessageRole, ToolCall,
};
pub use options::{
    CompletionOptions, FunctionDefinition, Prediction, ToolChoice, ToolDefinition,
};
