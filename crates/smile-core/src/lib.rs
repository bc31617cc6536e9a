//! Smile Core Library
//!
//! This crate compiles chat histories into token-budgeted request contexts
//! and streams completions from OpenAI-compatible providers, with
//! conversation persistence and configuration loading on top.

pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod recovery;
pub mod storage;
pub mod tokens;
pub mod types;

// Re-export commonly used types
pub use chat::{ChatSession, ChatState, PromptSettings};
pub use config::{Config, ConfigLoader};
pub use context::{CompiledContext, ContextCompiler};
pub use error::{SmileError, SmileResult};
pub use llm::{ChatOrchestrator, ChatProvider, ChatStream, OpenAiProvider, StreamOutcome};
pub use storage::{Conversation, ConversationStore, FileConversationStore, MemoryConversationStore};
pub use tokens::{TokenCounter, Tokenizer};
pub use types::*;
