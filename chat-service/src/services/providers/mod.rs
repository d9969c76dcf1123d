//! AI provider abstractions and implementations.
//!
//! The relay talks to a provider through two traits: a [`ChatProvider`] opens
//! sessions, and a [`ChatSession`] sends prompts within one conversation.
//! Backends (Gemini, mock) are swappable behind `Arc<dyn ChatProvider>`.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ContentFiltered(_) => "content_filtered",
            ProviderError::NetworkError(_) => "network_error",
        }
    }
}

/// Result of a single exchange with the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    /// Generated text, if the provider produced any.
    pub text: Option<String>,

    /// Input tokens consumed.
    pub input_tokens: i32,

    /// Output tokens generated.
    pub output_tokens: i32,

    /// Finish reason.
    pub finish_reason: FinishReason,
}

impl ProviderResponse {
    /// Generated text, treating an empty string the same as no text.
    pub fn non_empty_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
    Error,
}

impl FinishReason {
    /// Only a normal stop or the token limit counts as a usable result.
    pub fn from_gemini(reason: Option<&str>) -> Self {
        match reason {
            None | Some("STOP") | Some("FINISH_REASON_UNSPECIFIED") => FinishReason::Complete,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT")
            | Some("SPII") => FinishReason::ContentFilter,
            Some(_) => FinishReason::Error,
        }
    }
}

/// Speaker of a turn held in a session's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

/// A completed turn in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

/// One conversation with the provider.
#[async_trait]
pub trait ChatSession: Send {
    /// Send a prompt and wait for the complete, non-streamed reply.
    async fn send_message(&mut self, prompt: &str) -> Result<ProviderResponse, ProviderError>;

    /// Turns exchanged so far in this session.
    fn history(&self) -> &[Turn];
}

/// Trait for chat providers (e.g., Gemini).
pub trait ChatProvider: Send + Sync {
    /// Provider name used in logs and metrics.
    fn name(&self) -> &str;

    /// Model the provider generates with.
    fn model(&self) -> &str;

    /// Open a session with no prior turns.
    fn start_session(&self) -> Box<dyn ChatSession>;
}
