//! Gemini AI provider implementation.
//!
//! Implements chat sessions on top of Gemini's `generateContent` endpoint.
//! A session keeps its own turn history and replays it with every request.

use super::{
    ChatProvider, ChatSession, FinishReason, ProviderError, ProviderResponse, Turn, TurnRole,
};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Secret<String>,
    pub model: String,
    pub api_base: String,
    pub request_timeout: Duration,
}

/// Gemini chat provider.
pub struct GeminiChatProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiChatProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }
}

impl ChatProvider for GeminiChatProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn start_session(&self) -> Box<dyn ChatSession> {
        Box::new(GeminiChatSession {
            config: self.config.clone(),
            client: self.client.clone(),
            history: Vec::new(),
        })
    }
}

/// A conversation against one Gemini model.
pub struct GeminiChatSession {
    config: GeminiConfig,
    client: Client,
    history: Vec<Turn>,
}

impl GeminiChatSession {
    /// Build the API URL for the given method.
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.config.api_base.trim_end_matches('/'),
            self.config.model,
            method,
            self.config.api_key.expose_secret()
        )
    }

    fn build_request(&self, prompt: &str) -> GenerateContentRequest {
        let mut contents: Vec<Content> = self
            .history
            .iter()
            .map(|turn| Content {
                role: Some(turn.role.as_str().to_string()),
                parts: vec![ContentPart::Text {
                    text: turn.text.clone(),
                }],
            })
            .collect();

        contents.push(Content {
            role: Some(TurnRole::User.as_str().to_string()),
            parts: vec![ContentPart::Text {
                text: prompt.to_string(),
            }],
        });

        GenerateContentRequest { contents }
    }
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    async fn send_message(&mut self, prompt: &str) -> Result<ProviderResponse, ProviderError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ));
        }

        let request = self.build_request(prompt);
        let url = self.api_url("generateContent");

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            history_len = self.history.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let api_response: GenerateContentResponse = response.json().await.map_err(|e| {
            ProviderError::ApiError(format!("Failed to parse response: {}", e.without_url()))
        })?;

        if let Some(reason) = api_response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(ProviderError::ContentFiltered(format!(
                "prompt blocked: {}",
                reason
            )));
        }

        let candidate = api_response.candidates.first();

        let raw_reason = candidate.and_then(|c| c.finish_reason.as_deref());
        let finish_reason = FinishReason::from_gemini(raw_reason);

        match finish_reason {
            FinishReason::ContentFilter => {
                return Err(ProviderError::ContentFiltered(
                    raw_reason.unwrap_or_default().to_string(),
                ));
            }
            FinishReason::Error => {
                return Err(ProviderError::ApiError(format!(
                    "Generation stopped: {}",
                    raw_reason.unwrap_or_default()
                )));
            }
            _ => {}
        }

        // A reply may arrive split across several text parts.
        let text = candidate.and_then(|c| c.content.as_ref()).and_then(|content| {
            let texts: Vec<&str> = content
                .parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect();

            if texts.is_empty() {
                None
            } else {
                Some(texts.concat())
            }
        });

        let usage = api_response.usage_metadata.unwrap_or_default();

        self.history.push(Turn {
            role: TurnRole::User,
            text: prompt.to_string(),
        });
        self.history.push(Turn {
            role: TurnRole::Model,
            text: text.clone().unwrap_or_default(),
        });

        Ok(ProviderResponse {
            text,
            input_tokens: usage.prompt_token_count.unwrap_or(0),
            output_tokens: usage.candidates_token_count.unwrap_or(0),
            finish_reason,
        })
    }

    fn history(&self) -> &[Turn] {
        &self.history
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text { text: String },
    #[allow(dead_code)]
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/models/gemini-1.5-flash:generateContent";

    fn provider(server: &MockServer) -> GeminiChatProvider {
        GeminiChatProvider::new(GeminiConfig {
            api_key: Secret::new("test-key".to_string()),
            model: "gemini-1.5-flash".to_string(),
            api_base: server.uri(),
            request_timeout: Duration::from_secs(5),
        })
        .expect("Failed to build provider")
    }

    fn reply(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 7, "totalTokenCount": 19}
        })
    }

    #[tokio::test]
    async fn sends_single_user_turn_for_fresh_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("Hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = provider(&server).start_session();
        assert!(session.history().is_empty());

        let response = session.send_message("hello").await.unwrap();

        assert_eq!(response.text.as_deref(), Some("Hi there"));
        assert_eq!(response.input_tokens, 12);
        assert_eq!(response.output_tokens, 7);
        assert_eq!(response.finish_reason, FinishReason::Complete);
    }

    #[tokio::test]
    async fn concatenates_text_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "A Roth IRA "}, {"text": "is a retirement account."}]},
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let response = provider(&server)
            .start_session()
            .send_message("What is a Roth IRA?")
            .await
            .unwrap();

        assert_eq!(
            response.text.as_deref(),
            Some("A Roth IRA is a retirement account.")
        );
    }

    #[tokio::test]
    async fn no_candidates_yields_no_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let response = provider(&server)
            .start_session()
            .send_message("hello")
            .await
            .unwrap();

        assert_eq!(response.text, None);
        assert_eq!(response.non_empty_text(), None);
    }

    #[tokio::test]
    async fn replays_history_on_later_turns() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(body_partial_json(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "first"}]},
                    {"role": "model", "parts": [{"text": "one"}]},
                    {"role": "user", "parts": [{"text": "second"}]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("two")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("one")))
            .mount(&server)
            .await;

        let mut session = provider(&server).start_session();
        session.send_message("first").await.unwrap();
        let second = session.send_message("second").await.unwrap();

        assert_eq!(second.text.as_deref(), Some("two"));
        assert_eq!(session.history().len(), 4);
        assert_eq!(session.history()[3].role, TurnRole::Model);
    }

    #[tokio::test]
    async fn rate_limit_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = provider(&server)
            .start_session()
            .send_message("hello")
            .await
            .unwrap_err();

        assert_eq!(err, ProviderError::RateLimited);
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let mut session = provider(&server).start_session();
        let err = session.send_message("hello").await.unwrap_err();

        assert!(matches!(err, ProviderError::ApiError(_)));
        assert!(err.to_string().contains("API key not valid"));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn safety_finish_is_content_filtered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"finishReason": "SAFETY"}]
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .start_session()
            .send_message("hello")
            .await
            .unwrap_err();

        assert_eq!(err, ProviderError::ContentFiltered("SAFETY".to_string()));
    }

    async fn finish_reason_error(reason: &str) -> ProviderError {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"finishReason": reason}]
            })))
            .mount(&server)
            .await;

        let mut session = provider(&server).start_session();
        let err = session.send_message("hello").await.unwrap_err();
        assert!(session.history().is_empty());
        err
    }

    #[tokio::test]
    async fn other_finish_is_an_error() {
        let err = finish_reason_error("OTHER").await;
        assert_eq!(
            err,
            ProviderError::ApiError("Generation stopped: OTHER".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_finish_is_an_error() {
        let err = finish_reason_error("LANGUAGE").await;
        assert_eq!(
            err,
            ProviderError::ApiError("Generation stopped: LANGUAGE".to_string())
        );
    }

    #[tokio::test]
    async fn spii_finish_is_content_filtered() {
        let err = finish_reason_error("SPII").await;
        assert_eq!(err, ProviderError::ContentFiltered("SPII".to_string()));
    }

    #[tokio::test]
    async fn max_tokens_finish_keeps_partial_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "A Roth IRA is"}]},
                    "finishReason": "MAX_TOKENS"
                }]
            })))
            .mount(&server)
            .await;

        let response = provider(&server)
            .start_session()
            .send_message("hello")
            .await
            .unwrap();

        assert_eq!(response.text.as_deref(), Some("A Roth IRA is"));
        assert_eq!(response.finish_reason, FinishReason::Length);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(reply("too late"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let provider = GeminiChatProvider::new(GeminiConfig {
            api_key: Secret::new("test-key".to_string()),
            model: "gemini-1.5-flash".to_string(),
            api_base: server.uri(),
            request_timeout: Duration::from_millis(100),
        })
        .unwrap();

        let err = provider
            .start_session()
            .send_message("hello")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::NetworkError(_)));
    }

    #[tokio::test]
    async fn blocked_prompt_is_content_filtered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "OTHER"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .start_session()
            .send_message("hello")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::ContentFiltered(_)));
    }

    #[tokio::test]
    async fn empty_api_key_is_not_configured() {
        let server = MockServer::start().await;
        let provider = GeminiChatProvider::new(GeminiConfig {
            api_key: Secret::new(String::new()),
            model: "gemini-1.5-flash".to_string(),
            api_base: server.uri(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap();

        let err = provider
            .start_session()
            .send_message("hello")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn unreachable_provider_is_network_error() {
        let provider = GeminiChatProvider::new(GeminiConfig {
            api_key: Secret::new("test-key".to_string()),
            model: "gemini-1.5-flash".to_string(),
            api_base: "http://127.0.0.1:1".to_string(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap();

        let err = provider
            .start_session()
            .send_message("hello")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::NetworkError(_)));
        assert!(!err.to_string().contains("test-key"));
    }
}
