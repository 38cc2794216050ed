//! Health check endpoint
//!
//! GET /health - liveness probe, public

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

/// GET /health - always 200 while the process is alive.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "UP" })))
}
