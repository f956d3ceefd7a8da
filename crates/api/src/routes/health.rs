use axum::Json;
use chrono::Utc;

use crate::types::HealthResponse;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, body = HealthResponse)))]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string(), timestamp: Utc::now() })
}
