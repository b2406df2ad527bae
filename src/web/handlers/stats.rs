//! Health and statistics handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "ok".
    pub status: &'static str,
    /// Uptime in seconds.
    pub uptime: u64,
}

/// Statistics response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Number of connected participants.
    pub connected_users: usize,
    /// Number of messages in history.
    pub message_count: usize,
    /// Uptime in seconds.
    pub uptime: u64,
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime: state.uptime_secs(),
    })
}

/// GET /api/stats
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        connected_users: state.coordinator.participant_count().await,
        message_count: state.coordinator.history_len().await,
        uptime: state.uptime_secs(),
    })
}
