//! Orchestrator tests against a scripted provider

#[cfg(test)]
mod tests {
    use crate::error::{SmileError, SmileResult};
    use crate::llm::model_info::ModelSettings;
    use crate::llm::orchestrator::ChatOrchestrator;
    use crate::llm::streaming::{
        ChatProvider, ProviderStream, StreamChunk, StreamOutcome, ToolCallDelta,
    };
    use crate::recovery::RetryConfig;
    use crate::tokens::{HeuristicTokenizer, TokenCounter};
    use crate::types::{ChatMessage, CompletionOptions, MessageRole};
    use async_trait::async_trait;
    use futures::{StreamExt, stream};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    enum Script {
        Fail(SmileError),
        Chunks(Vec<StreamChunk>),
        /// Yield these chunks, then never finish
        Stall(Vec<StreamChunk>),
    }

    #[derive(Default)]
    struct ScriptedProvider {
        scripts: Mutex<VecDeque<Script>>,
        opens: AtomicUsize,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedProvider {
        fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
                ..Default::default()
            })
        }

        fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn open_stream(
            &self,
            messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> SmileResult<ProviderStream> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push(messages.to_vec());
            match self.scripts.lock().pop_front() {
                Some(Script::Fail(error)) => Err(error),
                Some(Script::Chunks(chunks)) => Ok(Box::pin(stream::iter(
                    chunks.into_iter().map(Ok).collect::<Vec<_>>(),
                ))),
                Some(Script::Stall(chunks)) => Ok(Box::pin(
                    stream::iter(chunks.into_iter().map(Ok).collect::<Vec<_>>())
                        .chain(stream::pending()),
                )),
                None => Err(SmileError::other("script exhausted")),
            }
        }
    }

    fn text(pieces: &[&str]) -> Vec<StreamChunk> {
        pieces.iter().map(|p| StreamChunk::content(*p)).collect()
    }

    fn settings() -> ModelSettings {
        ModelSettings {
            model: "test-model".into(),
            context_length: 10_000,
            max_tokens: 100,
            supports_images: false,
        }
    }

    fn orchestrator(provider: Arc<ScriptedProvider>) -> ChatOrchestrator {
        ChatOrchestrator::new(provider, settings())
            .with_counter(TokenCounter::new(Arc::new(HeuristicTokenizer::new(1))))
            .with_safety_buffer(0)
            .with_retry(
                RetryConfig::default()
                    .with_max_attempts(3)
                    .with_initial_delay(Duration::from_millis(1)),
            )
    }

    fn history() -> Vec<ChatMessage> {
        vec![ChatMessage::user("Say hello")]
    }

    #[tokio::test]
    async fn accumulates_chunks_and_reports_growing_text() {
        let provider = ScriptedProvider::new(vec![Script::Chunks(text(&["Hel", "lo", " world"]))]);
        let orchestrator = orchestrator(provider.clone());

        let mut updates = Vec::new();
        let outcome = orchestrator
            .complete(&history(), &CancellationToken::new(), None, |t| {
                updates.push(t.to_string())
            })
            .await
            .unwrap();

        assert_eq!(updates, vec!["Hel", "Hello", "Hello world"]);
        match outcome {
            StreamOutcome::Completed { content, .. } => assert_eq!(content, "Hello world"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(provider.opens(), 1);
    }

    #[tokio::test]
    async fn cancellation_mid_stream_is_an_outcome_not_a_retry() {
        let provider = ScriptedProvider::new(vec![Script::Stall(text(&["Hel"]))]);
        let orchestrator = orchestrator(provider.clone());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        let outcome = orchestrator
            .complete(&history(), &cancel, None, move |_| trigger.cancel())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            StreamOutcome::Cancelled {
                partial: "Hel".into()
            }
        );
        assert_eq!(provider.opens(), 1);
    }

    #[tokio::test]
    async fn cancellation_during_backoff_stops_retrying() {
        let provider = ScriptedProvider::new(vec![
            Script::Fail(SmileError::http_status("unavailable", "http://x", 503)),
            Script::Chunks(text(&["late"])),
        ]);
        let orchestrator = orchestrator(provider.clone()).with_retry(
            RetryConfig::default().with_initial_delay(Duration::from_secs(60)),
        );
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = orchestrator
            .complete(&history(), &cancel, None, |_| {})
            .await
            .unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(provider.opens(), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let provider = ScriptedProvider::new(vec![
            Script::Fail(SmileError::http_status("unavailable", "http://x", 503)),
            Script::Fail(SmileError::network("connection reset")),
            Script::Chunks(text(&["ok"])),
        ]);
        let orchestrator = orchestrator(provider.clone());

        let outcome = orchestrator
            .complete(&history(), &CancellationToken::new(), None, |_| {})
            .await
            .unwrap();
        assert!(!outcome.is_cancelled());
        assert_eq!(provider.opens(), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let provider = ScriptedProvider::new(vec![
            Script::Fail(SmileError::http_status("bad key", "http://x", 401)),
            Script::Chunks(text(&["never"])),
        ]);
        let orchestrator = orchestrator(provider.clone());

        let err = orchestrator
            .complete(&history(), &CancellationToken::new(), None, |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(provider.opens(), 1);
    }

    #[tokio::test]
    async fn overflow_fails_before_any_request() {
        let provider = ScriptedProvider::new(vec![Script::Chunks(text(&["x"]))]);
        let orchestrator = orchestrator(provider.clone());

        let err = orchestrator
            .complete(
                &history(),
                &CancellationToken::new(),
                Some(CompletionOptions::new("").with_max_tokens(20_000)),
                |_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SmileError::ContextOverflow { .. }));
        assert_eq!(provider.opens(), 0);
    }

    #[tokio::test]
    async fn provider_receives_compiled_history() {
        let provider = ScriptedProvider::new(vec![Script::Chunks(text(&["fine"]))]);
        let orchestrator = orchestrator(provider.clone())
            .with_system_message(Some("Be concise".into()));

        let history = vec![
            ChatMessage::system("Be terse"),
            ChatMessage::user("first"),
            ChatMessage::user("second"),
        ];
        orchestrator
            .complete(&history, &CancellationToken::new(), None, |_| {})
            .await
            .unwrap();

        let seen = provider.seen.lock();
        let sent = &seen[0];
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].role(), MessageRole::System);
        assert_eq!(
            sent[0].content().map(|c| crate::context::render_content(c)),
            Some("Be terse\n\nBe concise".to_string())
        );
        assert_eq!(
            sent[1].content().map(|c| crate::context::render_content(c)),
            Some("first\n\nsecond".to_string())
        );
    }

    #[tokio::test]
    async fn tool_call_deltas_are_merged() {
        let chunks = vec![
            StreamChunk::tool_calls(vec![ToolCallDelta {
                index: 0,
                id: Some("call_1".into()),
                name: Some("clock".into()),
                arguments: Some("{\"tz\":".into()),
            }]),
            StreamChunk::tool_calls(vec![ToolCallDelta {
                index: 0,
                arguments: Some("\"UTC\"}".into()),
                ..Default::default()
            }]),
            StreamChunk::final_chunk(Some("tool_calls".into())),
        ];
        let provider = ScriptedProvider::new(vec![Script::Chunks(chunks)]);
        let orchestrator = orchestrator(provider);

        let mut updates = 0;
        let outcome = orchestrator
            .complete(&history(), &CancellationToken::new(), None, |_| updates += 1)
            .await
            .unwrap();

        assert_eq!(updates, 0);
        match outcome {
            StreamOutcome::Completed {
                tool_calls,
                finish_reason,
                ..
            } => {
                assert_eq!(tool_calls.len(), 1);
                assert_eq!(tool_calls[0].function.arguments, "{\"tz\":\"UTC\"}");
                assert_eq!(finish_reason.as_deref(), Some("tool_calls"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn consumer_cancel_closes_the_stream() {
        let provider = ScriptedProvider::new(vec![Script::Stall(text(&["a"]))]);
        let orchestrator = orchestrator(provider);

        let mut stream = orchestrator
            .stream_chat(&history(), &CancellationToken::new(), None)
            .await
            .unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.content.as_deref(), Some("a"));

        stream.cancel();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_errors_surface_after_partial_output() {
        struct Broken;

        #[async_trait]
        impl ChatProvider for Broken {
            fn name(&self) -> &str {
                "broken"
            }

            async fn open_stream(
                &self,
                _messages: &[ChatMessage],
                _options: &CompletionOptions,
            ) -> SmileResult<ProviderStream> {
                Ok(Box::pin(stream::iter(vec![
                    Ok(StreamChunk::content("par")),
                    Err(SmileError::network("connection reset")),
                ])))
            }
        }

        let orchestrator = ChatOrchestrator::new(Arc::new(Broken), settings())
            .with_counter(TokenCounter::new(Arc::new(HeuristicTokenizer::new(1))))
            .with_safety_buffer(0);
        let err = orchestrator
            .complete(&history(), &CancellationToken::new(), None, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, SmileError::Network { .. }));
    }
}
