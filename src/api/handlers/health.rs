use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct InfoResponse {
    pub status: String,
    pub message: String,
    pub storage_status: String,
    pub version: String,
}

#[derive(Serialize, ToSchema)]
pub struct PingResponse {
    pub status: String,
    pub message: String,
    pub timestamp: i64,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub storage_connected: bool,
    pub metadata_enabled: bool,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Server identity", body = InfoResponse)
    ),
    tag = "system"
)]
pub async fn home(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        status: "success".to_string(),
        message: "Camera upload relay is running".to_string(),
        storage_status: if state.storage_connected {
            "connected"
        } else {
            "disconnected"
        }
        .to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/test",
    responses(
        (status = 200, description = "Liveness probe", body = PingResponse)
    ),
    tag = "system"
)]
pub async fn ping() -> impl IntoResponse {
    Json(PingResponse {
        status: "ok".to_string(),
        message: "Server is working".to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        storage_connected: state.storage_connected,
        metadata_enabled: state.relay.metadata_enabled(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
