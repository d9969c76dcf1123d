//! Wire types for the chat endpoint.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One turn of the client's conversation.
///
/// `role` is free-form ("user", "assistant", "system", or anything else).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Conversation submitted to `POST /chat`, oldest message first.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "messages must contain at least one message"))]
    pub messages: Vec<Message>,
}

impl ChatRequest {
    /// The most recent message, regardless of its role.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}
