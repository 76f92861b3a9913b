pub mod qr;
pub mod transactions;
pub mod ws;

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub db: String,
    /// Connected realtime observers, absent when the hub is not running.
    pub observers: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthStatus),
        (status = 503, description = "Service is unhealthy", body = HealthStatus)
    ),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = match state.engine.repository().ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!("Health check database probe failed: {}", e);
            "disconnected"
        }
    };

    let observers = state.hub.observer_count().await.ok();

    let healthy = db_status == "connected" && observers.is_some();
    let health_response = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db: db_status.to_string(),
        observers,
    };

    // Return 503 if database or hub is down, 200 otherwise
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_response))
}
