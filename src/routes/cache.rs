//! `POST /cache/clear` drops every cached city feed, forcing the next
//! `/cities` call to go back to the WAQI API.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::info;

use super::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/cache/clear", post(handler))
}

#[derive(Serialize)]
struct ClearResponse {
    cleared: usize,
}

async fn handler(State(state): State<AppState>) -> Json<ClearResponse> {
    // ---
    let cleared = state.waqi.cache().clear();
    info!("POST /cache/clear - dropped {} cached feeds", cleared);
    Json(ClearResponse { cleared })
}
