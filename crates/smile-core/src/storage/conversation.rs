//! Persisted conversation records

use crate::types::ChatMessage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title length before ellipsizing
pub const TITLE_MAX_CHARS: usize = 50;

/// `yyyyMMddHHmmss` in UTC
const ID_PREFIX_LEN: usize = 14;

/// New conversation id: a UTC timestamp prefix, `-`, then a v4 UUID.
/// Ids sort chronologically as plain strings.
pub fn generate_conversation_id() -> String {
    format!(
        "{}-{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        Uuid::new_v4().hyphenated()
    )
}

/// Whether `id` has the shape produced by [`generate_conversation_id`]
pub fn is_valid_conversation_id(id: &str) -> bool {
    if id.len() != ID_PREFIX_LEN + 1 + 36 || !id.is_ascii() {
        return false;
    }
    let (prefix, rest) = id.split_at(ID_PREFIX_LEN);
    let Some(uuid) = rest.strip_prefix('-') else {
        return false;
    };
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match Uuid::try_parse(uuid) {
        Ok(parsed) => {
            parsed.get_version_num() == 4 && parsed.get_variant() == uuid::Variant::RFC4122
        }
        Err(_) => false,
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Role of a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredRole {
    User,
    System,
    Assistant,
}

/// A message as persisted with its conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub role: StoredRole,
    pub content: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// For answers, the user message they respond to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub think_process_id: Option<String>,
}

impl StoredMessage {
    pub fn new(role: StoredRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: now_millis(),
            question_id: None,
            think_process_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(StoredRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(StoredRole::Assistant, content)
    }

    pub fn answering(mut self, question_id: impl Into<String>) -> Self {
        self.question_id = Some(question_id.into());
        self
    }

    /// The message as sent to a provider, keeping its id
    pub fn to_chat_message(&self) -> ChatMessage {
        let message = match self.role {
            StoredRole::User => ChatMessage::user(self.content.as_str()),
            StoredRole::System => ChatMessage::system(self.content.as_str()),
            StoredRole::Assistant => ChatMessage::assistant(self.content.as_str()),
        };
        message.with_id(&self.id)
    }
}

/// Reasoning captured for a think-mode answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkProcess {
    pub id: String,
    pub reasoning: String,
    pub prompt: String,
}

/// A conversation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    /// Set once the title was derived or edited; later messages leave it alone
    #[serde(default)]
    pub is_change_title: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    /// Last activity, milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default)]
    pub is_think_mode: bool,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub think_process: Vec<ThinkProcess>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: generate_conversation_id(),
            title: String::new(),
            is_change_title: false,
            persona: None,
            custom_instructions: None,
            timestamp: now_millis(),
            is_think_mode: false,
            messages: Vec::new(),
            think_process: Vec::new(),
        }
    }

    pub fn with_persona(mut self, persona: Option<String>) -> Self {
        self.persona = persona;
        self
    }

    pub fn with_custom_instructions(mut self, instructions: Option<String>) -> Self {
        self.custom_instructions = instructions;
        self
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.timestamp = now_millis();
    }

    /// Derive the title from `text` unless it was already set
    pub fn title_from(&mut self, text: &str) {
        if self.is_change_title {
            return;
        }
        self.title = make_title(text);
        self.is_change_title = true;
    }

    /// Messages in provider form, oldest first
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(StoredMessage::to_chat_message).collect()
    }

    pub fn position_of(&self, message_id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == message_id)
    }

    pub fn last_message(&self) -> Option<&StoredMessage> {
        self.messages.last()
    }
}

/// First line of `text`, trimmed, at most [`TITLE_MAX_CHARS`] characters
pub fn make_title(text: &str) -> String {
    let line = text.trim().lines().next().unwrap_or_default().trim();
    if line.chars().count() <= TITLE_MAX_CHARS {
        return line.to_string();
    }
    let head: String = line.chars().take(TITLE_MAX_CHARS).collect();
    format!("{}...", head.trim_end())
}
