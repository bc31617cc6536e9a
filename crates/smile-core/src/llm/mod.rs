//! LLM access: model table, providers, streaming and orchestration

pub mod model_info;
pub mod orchestrator;
pub mod providers;
pub mod sse;
pub mod streaming;

#[cfg(test)]
mod orchestrator_tests;

pub use model_info::{
    DEFAULT_CONTEXT_LENGTH, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, LlmInfo, ModelSettings,
    find_llm_info, legacy_context_length,
};
pub use orchestrator::ChatOrchestrator;
pub use providers::OpenAiProvider;
pub use sse::{SseDecoder, SseEvent};
pub use streaming::{
    ChatProvider, ChatStream, MAX_TOOL_CALL_INDEX, ProviderStream, StreamChunk, StreamOutcome,
    ToolCallAccumulator, ToolCallDelta,
};
