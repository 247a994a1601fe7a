use axum::Router;
use sqlx::PgPool;

use crate::{Config, WaqiClient};

mod aqi;
mod cache;
mod cities;
mod health;

// ---

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    // ---
    pub pool: PgPool,
    pub config: Config,
    pub waqi: WaqiClient,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(aqi::router())
        .merge(cities::router())
        .merge(cache::router())
        .merge(health::router())
        .with_state(state)
}
