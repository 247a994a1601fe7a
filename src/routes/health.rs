// src/routes/health.rs
//! Liveness endpoint for the air quality backend.
//!
//! `/health` answers as long as the process can serve HTTP. It reports how
//! many city feeds the cache currently holds but never touches the database
//! or the WAQI API, so a slow upstream does not make the service look dead.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    cached_feeds: usize,
}

/// Handle `GET /health`.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cached_feeds: state.waqi.cache().len(),
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
