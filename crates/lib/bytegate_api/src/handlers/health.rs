//! Liveness endpoint.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /actuator/health`: process is up.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP",
        version: bytegate_core::version(),
    })
}
