//! Chat message types

use serde::{Deserialize, Serialize};

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions)
    System,
    /// User message (human input)
    User,
    /// Assistant message (model response)
    Assistant,
    /// Tool message (tool execution result)
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// Image reference inside structured content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// Remote URL or data URL
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// One segment of structured message content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl MessagePart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part
    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: None,
            },
        }
    }
}

/// Message content: plain text or an ordered list of parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<MessagePart>),
}

impl MessageContent {
    /// True when the content carries nothing worth sending.
    ///
    /// Text is empty when it trims to nothing. Structured content is empty
    /// only when every part is blank text; an image always counts as content.
    pub fn is_blank(&self) -> bool {
        match self {
            MessageContent::Text(text) => text.trim().is_empty(),
            MessageContent::Parts(parts) => parts.iter().all(|part| match part {
                MessagePart::Text { text } => text.trim().is_empty(),
                MessagePart::ImageUrl { .. } => false,
            }),
        }
    }

    /// Whether any part is an image
    pub fn has_images(&self) -> bool {
        match self {
            MessageContent::Text(_) => false,
            MessageContent::Parts(parts) => parts
                .iter()
                .any(|part| matches!(part, MessagePart::ImageUrl { .. })),
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<Vec<MessagePart>> for MessageContent {
    fn from(parts: Vec<MessagePart>) -> Self {
        MessageContent::Parts(parts)
    }
}

/// Function invocation requested by the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments; may be incomplete while streaming
    pub arguments: String,
}

/// A tool call carried by an assistant message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub kind: String,
    pub function: FunctionCall,
}

fn default_tool_type() -> String {
    "function".to_string()
}

impl ToolCall {
    /// Create a function tool call
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: default_tool_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// A chat message, one variant per role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System {
        id: String,
        content: MessageContent,
    },
    User {
        id: String,
        content: MessageContent,
    },
    Assistant {
        id: String,
        content: MessageContent,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        id: String,
        content: String,
        tool_call_id: String,
    },
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ChatMessage {
    /// Create a system message with a fresh id
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::System {
            id: new_id(),
            content: content.into(),
        }
    }

    /// Create a user message with a fresh id
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::User {
            id: new_id(),
            content: content.into(),
        }
    }

    /// Create an assistant message with a fresh id
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::Assistant {
            id: new_id(),
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message carrying tool calls
    pub fn assistant_with_tools(
        content: impl Into<MessageContent>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self::Assistant {
            id: new_id(),
            content: content.into(),
            tool_calls,
        }
    }

    /// Create a tool result message
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self::Tool {
            id: new_id(),
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Replace the id, keeping everything else
    pub fn with_id(mut self, new: impl Into<String>) -> Self {
        let new = new.into();
        match &mut self {
            Self::System { id, .. }
            | Self::User { id, .. }
            | Self::Assistant { id, .. }
            | Self::Tool { id, .. } => *id = new,
        }
        self
    }

    pub fn id(&self) -> &str {
        match self {
            Self::System { id, .. }
            | Self::User { id, .. }
            | Self::Assistant { id, .. }
            | Self::Tool { id, .. } => id,
        }
    }

    pub fn role(&self) -> MessageRole {
        match self {
            Self::System { .. } => MessageRole::System,
            Self::User { .. } => MessageRole::User,
            Self::Assistant { .. } => MessageRole::Assistant,
            Self::Tool { .. } => MessageRole::Tool,
        }
    }

    /// Structured content for every role except tool results
    pub fn content(&self) -> Option<&MessageContent> {
        match self {
            Self::System { content, .. }
            | Self::User { content, .. }
            | Self::Assistant { content, .. } => Some(content),
            Self::Tool { .. } => None,
        }
    }

    /// Tool calls carried by an assistant message
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }

    /// Replace the content with plain text.
    ///
    /// Structured content collapses to text; tool calls and ids are kept.
    pub fn set_text(&mut self, text: String) {
        match self {
            Self::System { content, .. }
            | Self::User { content, .. }
            | Self::Assistant { content, .. } => *content = MessageContent::Text(text),
            Self::Tool { content, .. } => *content = text,
        }
    }

    /// Whether the message carries nothing a provider would accept.
    ///
    /// An assistant turn that only requests tools is not empty, and tool
    /// results are never empty even when the result string is.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::System { content, .. } | Self::User { content, .. } => content.is_blank(),
            Self::Assistant {
                content,
                tool_calls,
                ..
            } => tool_calls.is_empty() && content.is_blank(),
            Self::Tool { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_role_tag() {
        let msg = ChatMessage::user("hi").with_id("m1");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
        assert_eq!(json["id"], "m1");

        let back: ChatMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn structured_content_round_trips_through_json() {
        let msg = ChatMessage::user(vec![
            MessagePart::text("look"),
            MessagePart::image("https://example.com/cat.png"),
        ]);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"image_url\""));
        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn emptiness_depends_on_role() {
        assert!(ChatMessage::user("   ").is_empty());
        assert!(ChatMessage::assistant("").is_empty());
        assert!(!ChatMessage::assistant_with_tools(
            "",
            vec![ToolCall::function("c1", "search", "{}")]
        )
        .is_empty());
        assert!(!ChatMessage::tool("", "c1").is_empty());
        assert!(!ChatMessage::user(vec![MessagePart::image("https://x/y.png")]).is_empty());
    }

    #[test]
    fn set_text_keeps_tool_calls() {
        let mut msg = ChatMessage::assistant_with_tools(
            vec![MessagePart::text("a")],
            vec![ToolCall::function("c1", "search", "{}")],
        );
        msg.set_text("b".to_string());
        assert_eq!(msg.content(), Some(&MessageContent::Text("b".to_string())));
        assert!(msg.has_tool_calls());
    }
}
