//! `GET /aqi` converts a single PM2.5 reading without touching the network.
//!
//! `pm25` is taken as text so a missing or unparsable value produces the
//! "No Data" assessment instead of a 400.

use axum::{extract::Query, routing::get, Json, Router};
use serde::Deserialize;
use tracing::debug;

use crate::aqi::{assess_pm25, AqiAssessment};

// ---

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // ---
    Router::new().route("/aqi", get(handler))
}

/// Query parameters for `/aqi`
#[derive(Debug, Deserialize)]
pub struct AqiQuery {
    pm25: Option<String>,
}

async fn handler(Query(params): Query<AqiQuery>) -> Json<AqiAssessment> {
    // ---
    let reading = parse_reading(params.pm25.as_deref());
    let assessment = assess_pm25(reading);
    debug!(
        "GET /aqi - pm25={:?} aqi={:?} category={}",
        reading, assessment.aqi, assessment.category
    );
    Json(assessment)
}

fn parse_reading(raw: Option<&str>) -> Option<f64> {
    // ---
    raw.and_then(|v| v.trim().parse::<f64>().ok())
}
