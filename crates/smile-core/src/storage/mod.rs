//! Conversation persistence

pub mod conversation;
pub mod store;

pub use conversation::{
    Conversation, StoredMessage, StoredRole, TITLE_MAX_CHARS, ThinkProcess,
    generate_conversation_id, is_valid_conversation_id, make_title,
};
pub use store::{ConversationStore, FileConversationStore, MemoryConversationStore};

#[cfg(test)]
pub use store::MockConversationStore;
