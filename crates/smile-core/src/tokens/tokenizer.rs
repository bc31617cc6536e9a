//! Tokenizer abstraction and model-family resolution

use once_cell::sync::Lazy;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

/// Counts and slices text in model tokens
pub trait Tokenizer: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize;

    /// Keep at most `max_tokens` from the end of `text`
    fn keep_last(&self, text: &str, max_tokens: usize) -> String;

    /// Keep at most `max_tokens` from the start of `text`
    fn keep_first(&self, text: &str, max_tokens: usize) -> String;
}

/// BPE vocabularies bundled with tiktoken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    O200kBase,
    Cl100kBase,
    P50kBase,
    /// GPT-2 vocabulary, the conservative fallback
    R50kBase,
}

impl Encoding {
    /// Pick the encoding for a model name, `None` if the family is unknown
    pub fn for_model(model: &str) -> Option<Self> {
        let model = model.to_lowercase();
        let model = model.rsplit('/').next().unwrap_or(&model);

        const O200K: &[&str] = &[
            "gpt-4o", "chatgpt-4o", "gpt-4.1", "gpt-4.5", "gpt-5", "o1", "o3", "o4",
        ];
        const CL100K: &[&str] = &["gpt-4", "gpt-3.5", "gpt-35", "text-embedding-"];
        const P50K: &[&str] = &["text-davinci-002", "text-davinci-003", "code-"];

        if O200K.iter().any(|prefix| model.starts_with(prefix)) {
            Some(Self::O200kBase)
        } else if CL100K.iter().any(|prefix| model.starts_with(prefix)) {
            Some(Self::Cl100kBase)
        } else if P50K.iter().any(|prefix| model.starts_with(prefix)) {
            Some(Self::P50kBase)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::O200kBase => "o200k_base",
            Self::Cl100kBase => "cl100k_base",
            Self::P50kBase => "p50k_base",
            Self::R50kBase => "r50k_base",
        }
    }

    fn bpe(&self) -> Option<&'static CoreBPE> {
        static O200K: Lazy<Option<CoreBPE>> = Lazy::new(|| tiktoken_rs::o200k_base().ok());
        static CL100K: Lazy<Option<CoreBPE>> = Lazy::new(|| tiktoken_rs::cl100k_base().ok());
        static P50K: Lazy<Option<CoreBPE>> = Lazy::new(|| tiktoken_rs::p50k_base().ok());
        static R50K: Lazy<Option<CoreBPE>> = Lazy::new(|| tiktoken_rs::r50k_base().ok());

        match self {
            Self::O200kBase => O200K.as_ref(),
            Self::Cl100kBase => CL100K.as_ref(),
            Self::P50kBase => P50K.as_ref(),
            Self::R50kBase => R50K.as_ref(),
        }
    }
}

/// Tokenizer backed by a tiktoken BPE
pub struct BpeTokenizer {
    encoding: Encoding,
    bpe: &'static CoreBPE,
}

impl BpeTokenizer {
    /// Load an encoding, `None` if its data failed to initialize
    pub fn new(encoding: Encoding) -> Option<Self> {
        encoding.bpe().map(|bpe| Self { encoding, bpe })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Decode a token window, dropping tokens at the cut edge until the
    /// window lands on a UTF-8 boundary.
    fn decode_window(&self, tokens: &[u32], from_end: bool) -> String {
        let mut window = tokens;
        while !window.is_empty() {
            if let Ok(text) = self.bpe.decode(window.to_vec()) {
                return text;
            }
            window = if from_end {
                &window[1..]
            } else {
                &window[..window.len() - 1]
            };
        }
        String::new()
    }
}

impl Tokenizer for BpeTokenizer {
    fn name(&self) -> &str {
        self.encoding.name()
    }

    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    fn keep_last(&self, text: &str, max_tokens: usize) -> String {
        let tokens = self.bpe.encode_with_special_tokens(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }
        self.decode_window(&tokens[tokens.len() - max_tokens..], true)
    }

    fn keep_first(&self, text: &str, max_tokens: usize) -> String {
        let tokens = self.bpe.encode_with_special_tokens(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }
        self.decode_window(&tokens[..max_tokens], false)
    }
}

/// Character-ratio estimator used when no BPE data is available
#[derive(Debug, Clone)]
pub struct HeuristicTokenizer {
    chars_per_token: usize,
}

impl Default for HeuristicTokenizer {
    fn default() -> Self {
        Self { chars_per_token: 4 }
    }
}

impl HeuristicTokenizer {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Tokenizer for HeuristicTokenizer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    fn keep_last(&self, text: &str, max_tokens: usize) -> String {
        let total = text.chars().count();
        let keep = max_tokens.saturating_mul(self.chars_per_token);
        if total <= keep {
            return text.to_string();
        }
        text.chars().skip(total - keep).collect()
    }

    fn keep_first(&self, text: &str, max_tokens: usize) -> String {
        let keep = max_tokens.saturating_mul(self.chars_per_token);
        text.chars().take(keep).collect()
    }
}

/// Resolve the tokenizer for a model.
///
/// Unknown families use [`Encoding::R50kBase`]. If the BPE data cannot be
/// loaded at all, the character heuristic takes over.
pub fn tokenizer_for_model(model: &str) -> Arc<dyn Tokenizer> {
    let encoding = Encoding::for_model(model).unwrap_or_else(|| {
        tracing::debug!(model = %model, "unknown model family, counting with r50k_base");
        Encoding::R50kBase
    });

    match BpeTokenizer::new(encoding) {
        Some(tokenizer) => Arc::new(tokenizer),
        None => {
            tracing::warn!(encoding = encoding.name(), "BPE data unavailable, estimating tokens");
            Arc::new(HeuristicTokenizer::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_model_families() {
        assert_eq!(Encoding::for_model("gpt-4o-mini"), Some(Encoding::O200kBase));
        assert_eq!(Encoding::for_model("o3-mini"), Some(Encoding::O200kBase));
        assert_eq!(Encoding::for_model("gpt-4-turbo"), Some(Encoding::Cl100kBase));
        assert_eq!(Encoding::for_model("GPT-3.5-Turbo"), Some(Encoding::Cl100kBase));
        assert_eq!(Encoding::for_model("openai/gpt-4o"), Some(Encoding::O200kBase));
        assert_eq!(Encoding::for_model("llama3.1:8b"), None);
    }

    #[test]
    fn unknown_models_still_count() {
        let tokenizer = tokenizer_for_model("some-local-model");
        assert!(tokenizer.count("hello world") > 0);
        assert_eq!(tokenizer.count(""), 0);
    }

    #[test]
    fn bpe_keep_last_respects_budget() {
        let tokenizer = tokenizer_for_model("gpt-4o");
        let text = "one two three four five six seven eight nine ten";
        let tail = tokenizer.keep_last(text, 3);
        assert!(tokenizer.count(&tail) <= 3);
        assert!(text.ends_with(&tail));
    }

    #[test]
    fn bpe_keep_first_respects_budget() {
        let tokenizer = tokenizer_for_model("gpt-4");
        let text = "alpha beta gamma delta epsilon";
        let head = tokenizer.keep_first(text, 2);
        assert!(tokenizer.count(&head) <= 2);
        assert!(text.starts_with(&head));
    }

    #[test]
    fn heuristic_slices_on_char_boundaries() {
        let tokenizer = HeuristicTokenizer::new(2);
        assert_eq!(tokenizer.count("héllo"), 3);
        assert_eq!(tokenizer.keep_last("héllo", 1), "lo");
        assert_eq!(tokenizer.keep_first("héllo", 1), "hé");
        assert_eq!(tokenizer.keep_last("hi", 5), "hi");
    }
}
