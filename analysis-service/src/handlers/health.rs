use crate::dtos::HealthResponse;
use axum::Json;
use chrono::{SecondsFormat, Utc};

/// Liveness probe. Depends on nothing, so it answers as long as the process serves.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
