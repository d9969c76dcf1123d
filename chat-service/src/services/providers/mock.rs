//! Mock provider implementation for testing.

use super::{
    ChatProvider, ChatSession, FinishReason, ProviderError, ProviderResponse, Turn, TurnRole,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// What every session of a [`MockChatProvider`] answers with.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Reply with this text.
    Reply(String),
    /// Reply successfully but without any text.
    Empty,
    /// Fail with this error.
    Fail(ProviderError),
}

/// A prompt observed by the mock, with the session history length at send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPrompt {
    pub prompt: String,
    pub history_len: usize,
}

/// Mock chat provider for testing.
#[derive(Clone)]
pub struct MockChatProvider {
    behavior: MockBehavior,
    recorded: Arc<Mutex<Vec<RecordedPrompt>>>,
}

impl MockChatProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            recorded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Reply(text.into()))
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Fail(error))
    }

    /// Prompts sent through any session of this provider, in order.
    pub fn recorded_prompts(&self) -> Vec<RecordedPrompt> {
        self.recorded
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

impl ChatProvider for MockChatProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn start_session(&self) -> Box<dyn ChatSession> {
        Box::new(MockChatSession {
            behavior: self.behavior.clone(),
            recorded: Arc::clone(&self.recorded),
            history: Vec::new(),
        })
    }
}

struct MockChatSession {
    behavior: MockBehavior,
    recorded: Arc<Mutex<Vec<RecordedPrompt>>>,
    history: Vec<Turn>,
}

#[async_trait]
impl ChatSession for MockChatSession {
    async fn send_message(&mut self, prompt: &str) -> Result<ProviderResponse, ProviderError> {
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.push(RecordedPrompt {
                prompt: prompt.to_string(),
                history_len: self.history.len(),
            });
        }

        let text = match &self.behavior {
            MockBehavior::Reply(text) => Some(text.clone()),
            MockBehavior::Empty => None,
            MockBehavior::Fail(error) => return Err(error.clone()),
        };

        self.history.push(Turn {
            role: TurnRole::User,
            text: prompt.to_string(),
        });
        self.history.push(Turn {
            role: TurnRole::Model,
            text: text.clone().unwrap_or_default(),
        });

        Ok(ProviderResponse {
            output_tokens: text.as_ref().map(|t| t.len() as i32 / 4).unwrap_or(0),
            text,
            input_tokens: prompt.len() as i32 / 4,
            finish_reason: FinishReason::Complete,
        })
    }

    fn history(&self) -> &[Turn] {
        &self.history
    }
}
