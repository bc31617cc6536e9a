//! Chat session state container
//!
//! Owns the live conversation and the transient flags a UI renders: loading,
//! regenerating and the in-progress assistant text. The compile and stream
//! pipeline stays stateless; this type feeds it copies.

use super::prompts::{PromptSettings, system_prompt};
use crate::error::{SmileError, SmileResult};
use crate::llm::{ChatOrchestrator, StreamOutcome};
use crate::storage::{Conversation, ConversationStore, StoredMessage, StoredRole};
use crate::types::ChatMessage;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Observable session state
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub conversation: Conversation,
    /// Whether `conversation` has been written to the store
    pub is_persisted: bool,
    pub is_loading: bool,
    pub is_regenerating: bool,
    /// Text of the answer being streamed; empty when idle
    pub stream_buffer: String,
}

impl ChatState {
    fn is_busy(&self) -> bool {
        self.is_loading || self.is_regenerating
    }
}

#[derive(Debug, Clone, Copy)]
enum Activity {
    Loading,
    Regenerating,
}

/// Resets the activity flag and the stream buffer when a turn ends, however it ends
struct ActivityGuard {
    state: Arc<Mutex<ChatState>>,
    activity: Activity,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.stream_buffer.clear();
        match self.activity {
            Activity::Loading => state.is_loading = false,
            Activity::Regenerating => state.is_regenerating = false,
        }
    }
}

/// One conversation driven through an orchestrator and persisted in a store
pub struct ChatSession {
    orchestrator: Arc<ChatOrchestrator>,
    store: Arc<dyn ConversationStore>,
    prompt: PromptSettings,
    state: Arc<Mutex<ChatState>>,
}

impl ChatSession {
    /// Start a fresh, not yet persisted conversation
    pub fn new(
        orchestrator: Arc<ChatOrchestrator>,
        store: Arc<dyn ConversationStore>,
        prompt: PromptSettings,
    ) -> Self {
        let conversation = Conversation::new()
            .with_persona(prompt.persona.clone())
            .with_custom_instructions(prompt.custom_instructions.clone());
        Self::with_state(
            orchestrator,
            store,
            prompt,
            ChatState {
                conversation,
                ..ChatState::default()
            },
        )
    }

    /// Resume conversation `id`, or start a new one when `id` is `None`
    pub async fn open(
        orchestrator: Arc<ChatOrchestrator>,
        store: Arc<dyn ConversationStore>,
        prompt: PromptSettings,
        id: Option<&str>,
    ) -> SmileResult<Self> {
        let Some(id) = id else {
            return Ok(Self::new(orchestrator, store, prompt));
        };
        let conversation = store.get_by_id(id).await?.ok_or_else(|| {
            SmileError::not_found_resource(format!("Conversation {} does not exist", id), "conversation")
        })?;
        debug!(id, messages = conversation.messages.len(), "opened conversation");
        Ok(Self::with_state(
            orchestrator,
            store,
            prompt,
            ChatState {
                conversation,
                is_persisted: true,
                ..ChatState::default()
            },
        ))
    }

    fn with_state(
        orchestrator: Arc<ChatOrchestrator>,
        store: Arc<dyn ConversationStore>,
        prompt: PromptSettings,
        state: ChatState,
    ) -> Self {
        Self {
            orchestrator,
            store,
            prompt,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Shared handle for observers
    pub fn state(&self) -> Arc<Mutex<ChatState>> {
        Arc::clone(&self.state)
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.lock().clone()
    }

    pub fn conversation_id(&self) -> String {
        self.state.lock().conversation.id.clone()
    }

    pub fn set_think_mode(&self, enabled: bool) {
        self.state.lock().conversation.is_think_mode = enabled;
    }

    pub fn toggle_think_mode(&self) -> bool {
        let mut state = self.state.lock();
        state.conversation.is_think_mode = !state.conversation.is_think_mode;
        state.conversation.is_think_mode
    }

    /// Working copy for the compiler: the system prompt, then `history`
    fn request_messages(&self, conversation: &Conversation, history: &[StoredMessage]) -> Vec<ChatMessage> {
        let settings = self.prompt.overridden_by(
            conversation.persona.as_deref(),
            conversation.custom_instructions.as_deref(),
        );
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(system_prompt(&settings)));
        messages.extend(history.iter().map(StoredMessage::to_chat_message));
        messages
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
        on_update: &mut (dyn FnMut(&str) + Send),
    ) -> SmileResult<StreamOutcome> {
        let state = Arc::clone(&self.state);
        self.orchestrator
            .complete(messages, cancel, None, move |text| {
                state.lock().stream_buffer = text.to_string();
                on_update(text);
            })
            .await
    }

    async fn persist(&self, conversation: &Conversation, is_persisted: bool) -> SmileResult<()> {
        if is_persisted {
            self.store.update(conversation).await
        } else {
            self.store.store(conversation).await?;
            self.state.lock().is_persisted = true;
            Ok(())
        }
    }

    /// Send a user message and stream the answer.
    ///
    /// The exchange is persisted only when the stream completes. On error or
    /// cancellation the user message is taken back out of the live
    /// conversation and nothing is written.
    pub async fn submit_user_message(
        &self,
        text: &str,
        cancel: &CancellationToken,
        on_update: &mut (dyn FnMut(&str) + Send),
    ) -> SmileResult<StreamOutcome> {
        if text.trim().is_empty() {
            return Err(SmileError::invalid_input_field("Message is empty", "text"));
        }

        let (question, messages) = {
            let mut state = self.state.lock();
            if state.is_busy() {
                return Err(SmileError::busy("A response is already being generated"));
            }
            let question = StoredMessage::user(text);
            state.conversation.messages.push(question.clone());
            state.conversation.title_from(text);
            state.is_loading = true;
            state.stream_buffer.clear();
            let messages = self.request_messages(&state.conversation, &state.conversation.messages);
            (question, messages)
        };
        let _guard = ActivityGuard {
            state: Arc::clone(&self.state),
            activity: Activity::Loading,
        };

        let outcome = self.stream(&messages, cancel, on_update).await;

        let answer = match &outcome {
            Ok(StreamOutcome::Completed { content, .. }) => content.clone(),
            Ok(StreamOutcome::Cancelled { .. }) | Err(_) => {
                self.roll_back(&question.id);
                return outcome;
            }
        };

        let (conversation, is_persisted) = {
            let mut state = self.state.lock();
            let answer = StoredMessage::assistant(answer).answering(&question.id);
            state.conversation.messages.push(answer);
            state.conversation.touch();
            (state.conversation.clone(), state.is_persisted)
        };

        self.persist(&conversation, is_persisted).await?;
        info!(id = %conversation.id, messages = conversation.messages.len(), "exchange saved");
        outcome
    }

    fn roll_back(&self, question_id: &str) {
        let mut state = self.state.lock();
        if let Some(at) = state.conversation.position_of(question_id) {
            state.conversation.messages.remove(at);
        }
        if state.conversation.messages.is_empty() {
            state.conversation.title.clear();
            state.conversation.is_change_title = false;
        }
    }

    /// Re-generate the assistant message `message_id` from the history before it
    pub async fn regenerate(
        &self,
        message_id: &str,
        cancel: &CancellationToken,
        on_update: &mut (dyn FnMut(&str) + Send),
    ) -> SmileResult<StreamOutcome> {
        let messages = {
            let mut state = self.state.lock();
            if state.is_busy() {
                return Err(SmileError::busy("A response is already being generated"));
            }
            let position = state.conversation.position_of(message_id).ok_or_else(|| {
                SmileError::not_found_resource(format!("Message {} does not exist", message_id), "message")
            })?;
            if state.conversation.messages[position].role != StoredRole::Assistant {
                return Err(SmileError::invalid_input_field(
                    "Only assistant messages can be regenerated",
                    "message_id",
                ));
            }
            state.is_regenerating = true;
            state.stream_buffer.clear();
            self.request_messages(&state.conversation, &state.conversation.messages[..position])
        };
        let _guard = ActivityGuard {
            state: Arc::clone(&self.state),
            activity: Activity::Regenerating,
        };

        let outcome = self.stream(&messages, cancel, on_update).await?;
        let StreamOutcome::Completed { content, .. } = &outcome else {
            return Ok(outcome);
        };

        let (conversation, is_persisted) = {
            let mut state = self.state.lock();
            if let Some(position) = state.conversation.position_of(message_id) {
                let message = &mut state.conversation.messages[position];
                message.content = content.clone();
                message.timestamp = chrono::Utc::now().timestamp_millis();
            }
            state.conversation.touch();
            (state.conversation.clone(), state.is_persisted)
        };

        self.persist(&conversation, is_persisted).await?;
        info!(id = %conversation.id, message_id, "answer regenerated");
        Ok(outcome)
    }
}
