//! Health check handler.

use crate::models::HealthResponse;
use axum::Json;

/// Liveness handler for `GET /health`.
///
/// Does NOT check the database; it only reports that the process is serving.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        health: "APP is up".to_string(),
    })
}
