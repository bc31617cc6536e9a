//! Conversation sessions on top of the compile and stream pipeline

pub mod prompts;
pub mod session;


pub use prompts::{DEFAULT_PERSONA, PromptSettings, system_prompt};
pub use session::{ChatSession, ChatState};
