use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::models::{ChatRequest, ChatResponse};
use crate::services::{generate_reply, AdvisorError};
use crate::startup::AppState;
use service_core::error::AppError;

impl From<AdvisorError> for AppError {
    fn from(err: AdvisorError) -> Self {
        match err {
            AdvisorError::EmptyConversation => {
                AppError::UnprocessableEntity(anyhow::anyhow!(err.to_string()))
            }
            AdvisorError::Provider(e) => AppError::Provider(e.to_string()),
        }
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    let detail = anyhow::anyhow!(rejection.body_text());
    match rejection.status() {
        StatusCode::UNPROCESSABLE_ENTITY => AppError::UnprocessableEntity(detail),
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(detail),
        _ => AppError::BadRequest(detail),
    }
}

#[tracing::instrument(skip(state, payload))]
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected chat payload");
        rejection_to_error(rejection)
    })?;

    request.validate().map_err(|e| {
        tracing::warn!(error = %e, "Chat request failed validation");
        e
    })?;

    tracing::info!(message_count = request.messages.len(), "Processing chat request");

    let response = generate_reply(state.provider.as_ref(), &request).await?;

    Ok(Json(ChatResponse { response }))
}
