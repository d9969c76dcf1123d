use axum::{response::IntoResponse, Json};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to GenAI Financial Assistant API"
    }))
}

/// Liveness check. Does not contact the provider.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy"
    }))
}
