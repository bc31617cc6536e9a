//! Provider implementations and their request/response helpers

pub mod error_hints;
pub mod openai;
pub mod request_builder;

pub use error_hints::{http_failure, sanitize_body, send_failure};
pub use openai::OpenAiProvider;
pub use request_builder::{apply_model_rules, max_stop_words, to_chat_body, to_chat_message};
