//! Health check handler.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub toolchain: &'static str,
}

/// GET /healthz - Health check.
///
/// Does not invoke the toolchain; a proxy whose upstream is down is still
/// able to answer from the module cache.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        toolchain: state.toolchain.name(),
    })
}
