//! Streaming completion orchestration
//!
//! Compiles the history against the model budget, opens the provider stream
//! behind the retry policy and hands the caller a cancellable [`ChatStream`].

use super::model_info::{DEFAULT_MAX_TOKENS, ModelSettings, find_llm_info};
use super::providers::OpenAiProvider;
use super::streaming::{ChatProvider, ChatStream, ProviderStream, StreamOutcome};
use crate::config::Config;
use crate::context::{CompileOptions, CompiledContext, ContextCompiler, DEFAULT_SAFETY_BUFFER};
use crate::error::SmileResult;
use crate::recovery::{RetryConfig, RetryPolicy, RetryResult};
use crate::tokens::TokenCounter;
use crate::types::{ChatMessage, CompletionOptions};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Chunks buffered between the producer task and the consumer
const CHANNEL_CAPACITY: usize = 64;

/// Drives one provider for one configured model
pub struct ChatOrchestrator {
    provider: Arc<dyn ChatProvider>,
    settings: ModelSettings,
    defaults: CompletionOptions,
    counter: TokenCounter,
    retry: RetryConfig,
    system_message: Option<String>,
    safety_buffer: usize,
}

impl ChatOrchestrator {
    pub fn new(provider: Arc<dyn ChatProvider>, settings: ModelSettings) -> Self {
        let defaults =
            CompletionOptions::new(&settings.model).with_max_tokens(settings.max_tokens);
        Self {
            counter: TokenCounter::for_model(&settings.model),
            provider,
            settings,
            defaults,
            retry: RetryConfig::default(),
            system_message: None,
            safety_buffer: DEFAULT_SAFETY_BUFFER,
        }
    }

    /// Orchestrator over the OpenAI-compatible provider described by `config`
    pub fn from_config(config: &Config) -> SmileResult<Self> {
        let provider = Arc::new(OpenAiProvider::from_config(config)?);
        Ok(Self::new(provider, config.model_settings())
            .with_defaults(config.completion_options())
            .with_retry(config.retry.clone())
            .with_system_message(config.system_message.clone()))
    }

    /// Request defaults; per-call options are merged over these
    pub fn with_defaults(mut self, defaults: CompletionOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Operator system message combined with the conversation's own
    pub fn with_system_message(mut self, system_message: Option<String>) -> Self {
        self.system_message = system_message.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_counter(mut self, counter: TokenCounter) -> Self {
        self.counter = counter;
        self
    }

    pub fn with_safety_buffer(mut self, safety_buffer: usize) -> Self {
        self.safety_buffer = safety_buffer;
        self
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Merge per-call options over the defaults
    pub fn resolve_options(&self, options: Option<CompletionOptions>) -> CompletionOptions {
        match options {
            Some(options) => options.merged_over(&self.defaults),
            None => self.defaults.clone(),
        }
    }

    /// Compile `messages` for the model named in `options`
    pub fn compile(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> SmileResult<CompiledContext> {
        let same_model = options.model == self.settings.model;
        let supports_images = if same_model {
            self.settings.supports_images
        } else {
            find_llm_info(&options.model).is_some_and(|info| info.supports_images)
        };

        let mut compile_options = CompileOptions::new(
            self.settings.context_length_for(&options.model),
            options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        )
        .with_images(supports_images)
        .with_tools(options.tools.clone())
        .with_safety_buffer(self.safety_buffer);
        if let Some(system) = &self.system_message {
            compile_options = compile_options.with_system_message(system.clone());
        }

        let compiler = if same_model {
            ContextCompiler::new(self.counter.clone())
        } else {
            ContextCompiler::for_model(&options.model)
        };
        compiler.compile_with_report(messages, &compile_options)
    }

    /// Compile, open the provider stream and start forwarding chunks.
    ///
    /// Cancelling `cancel` before the stream opens yields an already
    /// cancelled, empty stream rather than an error.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
        options: Option<CompletionOptions>,
    ) -> SmileResult<ChatStream> {
        let options = self.resolve_options(options);
        let compiled = self.compile(messages, &options)?;
        let token = cancel.child_token();

        info!(
            provider = %self.provider.name(),
            model = %options.model,
            messages = compiled.messages.len(),
            prompt_tokens = compiled.report.total_tokens,
            "starting completion"
        );

        let provider = &self.provider;
        let compiled_messages = &compiled.messages;
        let request = &options;
        let policy = RetryPolicy::with_config(self.retry.clone());
        let opened = policy
            .execute(
                move || provider.open_stream(compiled_messages, request),
                Some(token.clone()),
            )
            .await;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        match opened {
            RetryResult::Success(upstream) => {
                tokio::spawn(forward_chunks(upstream, tx, token.clone()));
            }
            RetryResult::Failed { error, attempts, .. } => {
                debug!(attempts, "provider stream could not be opened");
                return Err(error);
            }
            RetryResult::Cancelled => {
                debug!("cancelled before the provider stream opened");
                token.cancel();
                drop(tx);
            }
        }
        Ok(ChatStream::new(rx, token))
    }

    /// Stream to completion, reporting the accumulated text through `on_update`
    pub async fn complete<F>(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
        options: Option<CompletionOptions>,
        on_update: F,
    ) -> SmileResult<StreamOutcome>
    where
        F: FnMut(&str),
    {
        let stream = self.stream_chat(messages, cancel, options).await?;
        let outcome = stream.collect_with(on_update).await?;
        match &outcome {
            StreamOutcome::Completed {
                content,
                tool_calls,
                finish_reason,
            } => info!(
                chars = content.chars().count(),
                tool_calls = tool_calls.len(),
                finish_reason = finish_reason.as_deref().unwrap_or("none"),
                "completion finished"
            ),
            StreamOutcome::Cancelled { partial } => info!(
                partial_chars = partial.chars().count(),
                "completion cancelled"
            ),
        }
        Ok(outcome)
    }
}

/// Producer half: pull from the provider and push into the channel until
/// the stream ends, fails, or the consumer goes away.
async fn forward_chunks(
    mut upstream: ProviderStream,
    tx: mpsc::Sender<SmileResult<super::streaming::StreamChunk>>,
    token: CancellationToken,
) {
    loop {
        let item = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            item = upstream.next() => item,
        };
        let Some(item) = item else {
            break;
        };
        let failed = item.is_err();
        let sent = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            sent = tx.send(item) => sent,
        };
        if sent.is_err() || failed {
            break;
        }
    }
    debug!(cancelled = token.is_cancelled(), "chunk producer finished");
}
