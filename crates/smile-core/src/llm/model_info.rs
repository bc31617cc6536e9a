//! Model information and budget defaults
//!
//! Context length and completion limits are looked up per model rather than
//! per provider. Unknown models fall back to conservative defaults.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

/// Response tokens reserved when nothing else is known
pub const DEFAULT_MAX_TOKENS: usize = 4096;
/// Context window assumed for unknown models
pub const DEFAULT_CONTEXT_LENGTH: usize = 8096;
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Static description of a model
#[derive(Debug, Clone)]
pub struct LlmInfo {
    pub model: &'static str,
    pub display_name: &'static str,
    pub context_length: Option<usize>,
    pub max_completion_tokens: Option<usize>,
    /// When set, matching uses this pattern instead of the exact name
    pub regex: Option<Regex>,
    pub supports_images: bool,
}

impl LlmInfo {
    fn new(model: &'static str, display_name: &'static str) -> Self {
        Self {
            model,
            display_name,
            context_length: None,
            max_completion_tokens: None,
            regex: None,
            supports_images: false,
        }
    }

    fn limits(mut self, context_length: usize, max_completion_tokens: usize) -> Self {
        self.context_length = Some(context_length);
        self.max_completion_tokens = Some(max_completion_tokens);
        self
    }

    fn pattern(mut self, pattern: &str) -> Self {
        self.regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .ok();
        self
    }

    fn images(mut self) -> Self {
        self.supports_images = true;
        self
    }

    /// Whether `model` refers to this entry
    pub fn matches(&self, model: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(model),
            None => self.model == model,
        }
    }
}

static LLM_INFO: Lazy<Vec<LlmInfo>> = Lazy::new(|| {
    vec![
        LlmInfo::new("o3-mini", "o3 Mini").limits(128_000, 65_536),
        LlmInfo::new("o1", "o1")
            .limits(200_000, 100_000)
            .pattern(r"^o1(-\d{4}-\d{2}-\d{2})?$")
            .images(),
        LlmInfo::new("gpt-4o-mini", "GPT-4o Mini")
            .limits(128_000, 16_384)
            .pattern(r"^gpt-4o-mini")
            .images(),
        LlmInfo::new("gpt-4o", "GPT-4o")
            .limits(128_000, 16_384)
            .pattern(r"^(chatgpt-)?gpt-4o")
            .images(),
        LlmInfo::new("gpt-4.1", "GPT-4.1")
            .limits(1_047_576, 32_768)
            .pattern(r"^gpt-4\.1")
            .images(),
        LlmInfo::new("gpt-4-turbo", "GPT-4 Turbo")
            .limits(128_000, 4_096)
            .images(),
        LlmInfo::new("gpt-3.5-turbo", "GPT-3.5 Turbo").limits(16_385, 4_096),
        LlmInfo::new("text-embedding-3-large", "Text Embedding 3-Large"),
        LlmInfo::new("text-embedding-3-small", "Text Embedding 3-Small"),
        LlmInfo::new("text-embedding-ada-002", "Text Embedding Ada-002"),
    ]
});

/// Context lengths used when a request overrides the configured model
static LEGACY_CONTEXT_LENGTHS: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    HashMap::from([
        ("gpt-3.5-turbo", 4096),
        ("gpt-3.5-turbo-0613", 4096),
        ("gpt-3.5-turbo-16k", 16_384),
        ("gpt-35-turbo-16k", 16_384),
        ("gpt-35-turbo-0613", 4096),
        ("gpt-35-turbo", 4096),
        ("gpt-4", 4096),
        ("gpt-4-32k", 32_000),
        ("gpt-4-turbo-preview", 32_000),
    ])
});

/// Find the table entry for a model; first match wins
pub fn find_llm_info(model: &str) -> Option<&'static LlmInfo> {
    LLM_INFO.iter().find(|info| info.matches(model))
}

/// Context length from the legacy table
pub fn legacy_context_length(model: &str) -> Option<usize> {
    LEGACY_CONTEXT_LENGTHS.get(model).copied()
}

/// Budget settings resolved for one configured model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub model: String,
    pub context_length: usize,
    pub max_tokens: usize,
    pub supports_images: bool,
}

impl ModelSettings {
    /// Resolve settings; explicit overrides win over the table.
    pub fn resolve(
        model: impl Into<String>,
        context_length: Option<usize>,
        max_tokens: Option<usize>,
    ) -> Self {
        let model = model.into();
        let info = find_llm_info(&model);

        let context_length = context_length
            .or_else(|| info.and_then(|info| info.context_length))
            .unwrap_or(DEFAULT_CONTEXT_LENGTH);
        let max_tokens = max_tokens.unwrap_or_else(|| {
            info.and_then(|info| info.max_completion_tokens)
                .map(|max| max.min(context_length / 4))
                .unwrap_or(DEFAULT_MAX_TOKENS)
        });

        Self {
            supports_images: info.is_some_and(|info| info.supports_images),
            model,
            context_length,
            max_tokens,
        }
    }

    /// Context length to budget a request against.
    ///
    /// A request for a different model than the configured one uses the
    /// legacy table when that model is listed there.
    pub fn context_length_for(&self, request_model: &str) -> usize {
        if request_model != self.model {
            if let Some(length) = legacy_context_length(request_model) {
                return length;
            }
        }
        self.context_length
    }
}
