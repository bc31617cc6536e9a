//! Context window management
//!
//! Takes an unbounded conversation and a fixed model window and produces a
//! message list that fits, following a fixed escalation policy:
//!
//! - [`render`]: plain-text views of content, used for counting and summaries
//! - [`ContextCompiler`]: filtering, system message placement, pruning
//! - [`HistoryPruner`]: the phased trim/summarize/drop/truncate policy
//! - [`flatten_messages`]: merge adjacent same-role entries
//!
//! # Example
//!
//! ```rust,ignore
//! use smile_core::context::{CompileOptions, ContextCompiler};
//!
//! let compiler = ContextCompiler::for_model("gpt-4o");
//! let options = CompileOptions::new(128_000, 4096).with_system_message("Be concise");
//! let messages = compiler.compile(&history, &options)?;
//! ```

pub mod compiler;
pub mod config;
pub mod flatten;
pub mod pruner;
pub mod render;

pub use compiler::{CompiledContext, ContextCompiler};
pub use config::{CompileOptions, ContextBudget, DEFAULT_SAFETY_BUFFER, MIN_RECENT_MESSAGES};
pub use flatten::flatten_messages;
pub use pruner::{HistoryPruner, PruneReport};
pub use render::{SUMMARY_CHARS, render_content, render_message, summarize_message};
