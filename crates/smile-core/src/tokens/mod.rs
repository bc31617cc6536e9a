//! Token counting
//!
//! [`TokenCounter`] prices messages for the context compiler. The underlying
//! [`Tokenizer`] is chosen per model family; unknown models fall back to the
//! GPT-2 vocabulary, which splits modern text into more pieces than the newer
//! encodings and therefore errs on the side of pruning too much.

mod counter;
mod tokenizer;

pub use counter::{IMAGE_TOKENS, MESSAGE_OVERHEAD_TOKENS, TokenCounter, count_tokens};
pub use tokenizer::{BpeTokenizer, Encoding, HeuristicTokenizer, Tokenizer, tokenizer_for_model};
