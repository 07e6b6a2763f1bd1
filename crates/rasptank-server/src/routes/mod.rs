//! HTTP route handlers.

pub mod ws;

use crate::state::AppState;
use axum::{Router, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// All routes: the session protocol on `/` and `/ws`, plus `/health`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(ws::upgrade))
        .route("/ws", get(ws::upgrade))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
