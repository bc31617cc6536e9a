//! Ctrl+C handling: cancel the answer being streamed, or exit at the prompt

use futures::stream::StreamExt;
use signal_hook::consts::SIGINT;
use signal_hook_tokio::Signals;
use smile_core::error::{SmileError, SmileResult};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What Ctrl+C applies to
#[derive(Debug, Clone)]
enum AppState {
    WaitingForInput,
    /// An answer is streaming; Ctrl+C cancels it
    Streaming(CancellationToken),
}

pub struct SignalHandler {
    state: Arc<Mutex<AppState>>,
    task_handle: Option<JoinHandle<()>>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(AppState::WaitingForInput)),
            task_handle: None,
        }
    }

    /// Start listening for SIGINT
    pub fn start(&mut self) -> SmileResult<()> {
        if self.task_handle.is_some() {
            return Ok(());
        }

        let mut signals = Signals::new([SIGINT])
            .map_err(|e| SmileError::io(format!("Failed to install signal handler: {}", e)))?;
        let state = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            while let Some(signal) = signals.next().await {
                if signal != SIGINT {
                    continue;
                }
                let current = match state.lock() {
                    Ok(guard) => guard.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                };
                match current {
                    AppState::WaitingForInput => {
                        eprintln!("\nGoodbye!");
                        std::process::exit(0);
                    }
                    AppState::Streaming(token) => {
                        tracing::debug!("interrupting streamed answer");
                        token.cancel();
                    }
                }
            }
        });

        self.task_handle = Some(handle);
        Ok(())
    }

    /// Enter streaming state; the returned token is cancelled by Ctrl+C
    pub fn begin_turn(&self) -> CancellationToken {
        let token = CancellationToken::new();
        self.set_state(AppState::Streaming(token.clone()));
        token
    }

    pub fn end_turn(&self) {
        self.set_state(AppState::WaitingForInput);
    }

    fn set_state(&self, next: AppState) {
        match self.state.lock() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SignalHandler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn turns_hand_out_fresh_tokens() {
        let handler = SignalHandler::new();
        let first = handler.begin_turn();
        handler.end_turn();
        let second = handler.begin_turn();
        first.cancel();
        assert!(!second.is_cancelled());
        assert!(matches!(*handler.state.lock().unwrap(), AppState::Streaming(_)));
        handler.end_turn();
        assert!(matches!(*handler.state.lock().unwrap(), AppState::WaitingForInput));
    }
}
