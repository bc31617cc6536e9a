//! Streaming primitives: chunks, the provider boundary and the consumer side
//! of a cancellable completion stream.

use crate::error::{SmileError, SmileResult};
use crate::types::{ChatMessage, CompletionOptions, ToolCall};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Incremental piece of a tool call; fields arrive spread over many chunks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Position of the call within the response
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Argument fragment to append
    pub arguments: Option<String>,
}

/// A chunk of streaming response data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Content delta
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallDelta>,
    pub finish_reason: Option<String>,
    /// Whether this is the final chunk
    pub is_final: bool,
}

impl StreamChunk {
    /// Create a content chunk
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Create a final chunk
    pub fn final_chunk(finish_reason: Option<String>) -> Self {
        Self {
            finish_reason,
            is_final: true,
            ..Default::default()
        }
    }

    /// Create a tool call chunk
    pub fn tool_calls(tool_calls: Vec<ToolCallDelta>) -> Self {
        Self {
            tool_calls,
            ..Default::default()
        }
    }
}

/// Stream of provider chunks
pub type ProviderStream = Pin<Box<dyn Stream<Item = SmileResult<StreamChunk>> + Send>>;

/// A chat-completion backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logs and errors
    fn name(&self) -> &str;

    /// Issue a completion request and return its chunk stream.
    ///
    /// Called once per attempt; failures before the first chunk are retried
    /// by the caller when they are transient.
    async fn open_stream(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> SmileResult<ProviderStream>;
}

/// Highest tool call index accepted from a provider
pub const MAX_TOOL_CALL_INDEX: usize = 127;

/// Merges tool call deltas by index into complete calls
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<usize, ToolCall>,
}

impl ToolCallAccumulator {
    /// Fold `delta` into the call at its index; indexes past
    /// [`MAX_TOOL_CALL_INDEX`] are rejected
    pub fn push(&mut self, delta: &ToolCallDelta) -> SmileResult<()> {
        if delta.index > MAX_TOOL_CALL_INDEX {
            return Err(SmileError::llm(format!(
                "Tool call index {} is out of range (max {})",
                delta.index, MAX_TOOL_CALL_INDEX
            )));
        }
        let call = self
            .calls
            .entry(delta.index)
            .or_insert_with(|| ToolCall::function("", "", ""));
        if let Some(id) = &delta.id {
            call.id = id.clone();
        }
        if let Some(name) = &delta.name {
            call.function.name.push_str(name);
        }
        if let Some(arguments) = &delta.arguments {
            call.function.arguments.push_str(arguments);
        }
        Ok(())
    }

    pub fn finish(self) -> Vec<ToolCall> {
        self.calls
            .into_values()
            .filter(|call| !call.function.name.is_empty())
            .collect()
    }
}

/// Terminal state of a consumed stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The stream was exhausted
    Completed {
        content: String,
        tool_calls: Vec<ToolCall>,
        finish_reason: Option<String>,
    },
    /// The caller cancelled; `partial` is whatever had arrived
    Cancelled { partial: String },
}

impl StreamOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The assistant message to persist, `None` when cancelled
    pub fn into_assistant_message(self) -> Option<ChatMessage> {
        match self {
            Self::Completed {
                content,
                tool_calls,
                ..
            } => Some(ChatMessage::assistant_with_tools(content, tool_calls)),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Consumer end of a completion stream.
///
/// A producer task pushes chunks into a bounded channel. [`ChatStream::cancel`]
/// closes the channel from this side, and dropping the stream stops the
/// producer. Cancellation ends the stream without an error.
pub struct ChatStream {
    receiver: ReceiverStream<SmileResult<StreamChunk>>,
    cancel: CancellationToken,
}

impl ChatStream {
    pub(crate) fn new(
        receiver: mpsc::Receiver<SmileResult<StreamChunk>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            receiver: ReceiverStream::new(receiver),
            cancel,
        }
    }

    /// Stop the producer and close the channel
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.receiver.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A handle that fires when this stream is cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain the stream, calling `on_update` with the accumulated text after
    /// every chunk that adds content.
    pub async fn collect_with<F>(mut self, mut on_update: F) -> SmileResult<StreamOutcome>
    where
        F: FnMut(&str),
    {
        let token = self.cancellation_token();
        let mut content = String::new();
        let mut tools = ToolCallAccumulator::default();
        let mut finish_reason = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Ok(StreamOutcome::Cancelled { partial: content });
                }
                next = self.next() => next,
            };

            let chunk = match next {
                Some(chunk) => chunk?,
                None => break,
            };

            for delta in &chunk.tool_calls {
                tools.push(delta)?;
            }
            if chunk.finish_reason.is_some() {
                finish_reason = chunk.finish_reason;
            }
            if let Some(delta) = chunk.content.filter(|delta| !delta.is_empty()) {
                content.push_str(&delta);
                on_update(&content);
            }
        }

        if token.is_cancelled() {
            return Ok(StreamOutcome::Cancelled { partial: content });
        }
        Ok(StreamOutcome::Completed {
            content,
            tool_calls: tools.finish(),
            finish_reason,
        })
    }
}

impl Stream for ChatStream {
    type Item = SmileResult<StreamChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_tool_call_fragments_by_index() {
        let mut acc = ToolCallAccumulator::default();
        acc.push(&ToolCallDelta {
            index: 0,
            id: Some("call_1".into()),
            name: Some("search".into()),
            arguments: Some("{\"q\":".into()),
        })
        .unwrap();
        acc.push(&ToolCallDelta {
            index: 0,
            arguments: Some("\"rust\"}".into()),
            ..Default::default()
        })
        .unwrap();
        acc.push(&ToolCallDelta {
            index: 1,
            id: Some("call_2".into()),
            name: Some("clock".into()),
            arguments: Some("{}".into()),
        })
        .unwrap();

        let calls = acc.finish();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.arguments, "{\"q\":\"rust\"}");
        assert_eq!(calls[1].function.name, "clock");
    }

    #[test]
    fn sparse_indexes_do_not_allocate_placeholders() {
        let mut acc = ToolCallAccumulator::default();
        acc.push(&ToolCallDelta {
            index: MAX_TOOL_CALL_INDEX,
            id: Some("call_last".into()),
            name: Some("clock".into()),
            arguments: Some("{}".into()),
        })
        .unwrap();

        assert_eq!(acc.calls.len(), 1);
        let calls = acc.finish();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_last");
    }

    #[test]
    fn rejects_out_of_range_index() {
        let mut acc = ToolCallAccumulator::default();
        let error = acc
            .push(&ToolCallDelta {
                index: 2_000_000,
                name: Some("boom".into()),
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(error, SmileError::Llm { .. }));
        assert!(acc.calls.is_empty());
    }

    #[tokio::test]
    async fn collect_fails_on_out_of_range_tool_index() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(Ok(StreamChunk::tool_calls(vec![ToolCallDelta {
            index: usize::MAX,
            name: Some("boom".into()),
            ..Default::default()
        }])))
        .await
        .unwrap();
        drop(tx);

        let result = ChatStream::new(rx, CancellationToken::new())
            .collect_with(|_| {})
            .await;
        assert!(matches!(result, Err(SmileError::Llm { .. })));
    }

    #[tokio::test]
    async fn collect_reports_growing_content() {
        let (tx, rx) = mpsc::channel(8);
        for piece in ["a", "", "b"] {
            tx.send(Ok(StreamChunk::content(piece))).await.unwrap();
        }
        tx.send(Ok(StreamChunk::final_chunk(Some("stop".into()))))
            .await
            .unwrap();
        drop(tx);

        let mut seen = Vec::new();
        let outcome = ChatStream::new(rx, CancellationToken::new())
            .collect_with(|text| seen.push(text.to_string()))
            .await
            .unwrap();

        assert_eq!(seen, vec!["a", "ab"]);
        assert_eq!(
            outcome,
            StreamOutcome::Completed {
                content: "ab".into(),
                tool_calls: vec![],
                finish_reason: Some("stop".into()),
            }
        );
    }

    #[tokio::test]
    async fn cancel_closes_the_channel() {
        let (tx, rx) = mpsc::channel::<SmileResult<StreamChunk>>(8);
        let mut stream = ChatStream::new(rx, CancellationToken::new());

        stream.cancel();
        assert!(stream.is_cancelled());
        assert!(tx.send(Ok(StreamChunk::content("late"))).await.is_err());
        assert!(stream.next().await.is_none());
    }
}
