//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_profile: &'static str,
    /// False when the review endpoints are open to any caller
    pub reviewer_gate: bool,
    /// Assignments waiting for a decision, absent if the store is unreachable
    pub pending_reviews: Option<usize>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let pending_reviews = state.tracker.pending_assignments().await.ok().map(|p| p.len());

    Json(HealthResponse {
        status: "ok",
        module: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        build_profile: env!("BUILD_PROFILE"),
        reviewer_gate: state.reviewer_id != 0,
        pending_reviews,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
