//! Financial-advisor reply generation.
//!
//! Turns a client conversation into one provider prompt and maps the outcome
//! to the reply text returned to the client.

use crate::models::ChatRequest;
use crate::services::providers::{ChatProvider, ProviderError};
use metrics::{counter, histogram};
use std::time::Instant;
use thiserror::Error;

/// Instruction prepended to every prompt.
pub const FINANCIAL_CONTEXT: &str = "You are a knowledgeable financial advisor assistant. \
Help users with financial queries, investment advice, and financial literacy. \
Provide clear, informative responses while noting that this is general advice \
and users should consult with professional financial advisors for personalized guidance.";

/// Reply used when the provider answers without any text.
pub const FALLBACK_RESPONSE: &str =
    "I apologize, but I couldn't generate a response. Please try rephrasing your question.";

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("conversation contains no messages")]
    EmptyConversation,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Combine the advisor instruction with the last message of the conversation.
///
/// Only the final message is used, whatever its role.
pub fn build_prompt(request: &ChatRequest) -> Result<String, AdvisorError> {
    let last = request
        .last_message()
        .ok_or(AdvisorError::EmptyConversation)?;

    Ok(format!("{}\n\nUser Query: {}", FINANCIAL_CONTEXT, last.content))
}

/// Ask the provider for a reply in a fresh, empty session.
#[tracing::instrument(skip_all, fields(provider = provider.name(), model = provider.model()))]
pub async fn generate_reply(
    provider: &dyn ChatProvider,
    request: &ChatRequest,
) -> Result<String, AdvisorError> {
    let prompt = build_prompt(request)?;

    let mut session = provider.start_session();

    let start = Instant::now();
    let result = session.send_message(&prompt).await;
    let elapsed = start.elapsed().as_secs_f64();

    let provider_name = provider.name().to_string();
    histogram!("genai_provider_latency_seconds", "provider" => provider_name.clone())
        .record(elapsed);

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            counter!(
                "genai_provider_requests_total",
                "provider" => provider_name,
                "outcome" => e.kind()
            )
            .increment(1);
            tracing::error!(error = %e, "Provider request failed");
            return Err(e.into());
        }
    };

    tracing::info!(
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        finish_reason = ?response.finish_reason,
        session_turns = session.history().len(),
        "Provider reply received"
    );

    match response.non_empty_text() {
        Some(text) => {
            counter!(
                "genai_provider_requests_total",
                "provider" => provider_name,
                "outcome" => "ok"
            )
            .increment(1);
            Ok(text.to_string())
        }
        None => {
            counter!(
                "genai_provider_requests_total",
                "provider" => provider_name,
                "outcome" => "empty"
            )
            .increment(1);
            tracing::warn!("Provider returned no text, using fallback reply");
            Ok(FALLBACK_RESPONSE.to_string())
        }
    }
}
