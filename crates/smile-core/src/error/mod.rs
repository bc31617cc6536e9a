//! Error types for Smile
//!
//! Every fallible operation in the crate returns [`SmileResult`]. Variants are
//! tagged by kind so callers (and the retry layer) can tell a cancelled
//! request from a transient network failure without inspecting message text.

mod classifiers;
mod constructors;
mod conversions;
mod types;
mod unified_error;
mod user_messages;

pub use types::{OptionExt, ResultExt, SmileError, SmileResult, UnifiedError};
pub use user_messages::{ErrorCategory, UserFriendlyError};
