//! Liveness handler.

use axum::Json;
use axum::response::IntoResponse;
use serde_json::json;

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}
