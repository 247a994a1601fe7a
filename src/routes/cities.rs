use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::AppState;
use crate::config::parse_city_list;
use crate::models::{CityAirQuality, CitySummary, PollutantReading};
use crate::report::{build_report, Report};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/cities", get(handler))
        .route("/cities/summary", get(summary_handler))
}

/// Query parameters for `/cities`
#[derive(Debug, Deserialize)]
pub struct CitiesQuery {
    /// Comma separated city names, e.g. "london,new york"
    cities: Option<String>,
    /// WAQI token override
    token: Option<String>,
    /// Drop the feed cache before fetching ("true", "1", "yes", "on")
    refresh: Option<String>,
}

#[derive(Debug, Serialize)]
struct CitiesResponse {
    fetch_id: Uuid,
    cities: Vec<CityAirQuality>,
    pollutants: Vec<PollutantReading>,
    report: Report,
}

async fn handler(
    Query(params): Query<CitiesQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // ---
    info!("GET /cities - Starting pipeline");

    // Step 1: Resolve selection
    debug!("GET /cities - Step 1");

    let selected = resolve_cities(params.cities.as_deref(), &state.config.default_cities);
    let token = params
        .token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(&state.config.api_token);

    if is_truthy(params.refresh.as_deref()) {
        let cleared = state.waqi.cache().clear();
        info!("Refresh requested, dropped {} cached feeds", cleared);
    }

    // Step 2: Fetch feeds (cache-aware)
    debug!("GET /cities - Step 2");

    let feeds = state.waqi.fetch_cities(&selected, token).await;
    if feeds.is_empty() {
        error!("No air quality data for any of {:?}", selected);
        return (
            StatusCode::BAD_GATEWAY,
            Json("No data available. Check the API token or try different cities."),
        )
            .into_response();
    }
    debug!("Feed cache now holds {} entries", state.waqi.cache().len());

    // Step 3: Transform and store
    debug!("GET /cities - Step 3");

    let fetch_id = Uuid::new_v4();
    let mut cities = Vec::with_capacity(feeds.len());
    let mut pollutants = Vec::new();

    for queried in &feeds {
        let record = queried.feed.to_city_record(&queried.query_city);
        let readings = queried.feed.to_pollutant_readings(&queried.query_city);

        if let Err(e) = store_city_observation(&state.pool, fetch_id, &record).await {
            error!("Failed to store observation for {}: {}", record.city, e);
        }
        for reading in &readings {
            if let Err(e) = store_pollutant_reading(&state.pool, fetch_id, reading).await {
                error!("Failed to store {} for {}: {}", reading.parameter, reading.city, e);
            }
        }

        cities.push(record);
        pollutants.extend(readings);
    }

    // Step 4: Update city summaries
    debug!("GET /cities - Step 4");

    if let Err(e) = update_city_summaries(&state.pool).await {
        error!("Failed to update summaries: {}", e);
    }

    // Step 5: Build report and return data
    let report = build_report(&cities, &pollutants);
    info!(
        "Pipeline complete, returning {} cities and {} pollutant rows",
        cities.len(),
        pollutants.len()
    );
    (
        StatusCode::OK,
        Json(CitiesResponse {
            fetch_id,
            cities,
            pollutants,
            report,
        }),
    )
        .into_response()
}

async fn summary_handler(State(state): State<AppState>) -> impl IntoResponse {
    // ---
    info!("GET /cities/summary");

    match load_city_summaries(&state.pool).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => {
            error!("Failed to load city summaries: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to load summaries"),
            )
                .into_response()
        }
    }
}

// ---

/// Requested cities, or the configured defaults when none are given.
fn resolve_cities(requested: Option<&str>, defaults: &[String]) -> Vec<String> {
    // ---
    let selected = requested.map(parse_city_list).unwrap_or_default();
    if selected.is_empty() {
        defaults.to_vec()
    } else {
        selected
    }
}

/// Lenient boolean query flag; anything unrecognized counts as false.
fn is_truthy(raw: Option<&str>) -> bool {
    // ---
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true") | Some("1") | Some("yes") | Some("on")
    )
}

async fn store_city_observation(
    pool: &PgPool,
    fetch_id: Uuid,
    record: &CityAirQuality,
) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO city_observations (
            fetch_id, city, query_city, country, aqi, aqi_category,
            latitude, longitude, observed_at, url
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(fetch_id)
    .bind(&record.city)
    .bind(&record.query_city)
    .bind(&record.country)
    .bind(record.aqi)
    .bind(record.aqi_category.label())
    .bind(record.latitude)
    .bind(record.longitude)
    .bind(record.observed_at)
    .bind(&record.url)
    .execute(pool)
    .await?;

    Ok(())
}

async fn store_pollutant_reading(
    pool: &PgPool,
    fetch_id: Uuid,
    reading: &PollutantReading,
) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO pollutant_readings (
            fetch_id, city, query_city, parameter, value, unit
        ) VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(fetch_id)
    .bind(&reading.city)
    .bind(&reading.query_city)
    .bind(&reading.parameter)
    .bind(reading.value)
    .bind(reading.unit)
    .execute(pool)
    .await?;

    Ok(())
}

/// Recompute per-city aggregates from all stored observations
async fn update_city_summaries(pool: &PgPool) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO city_summary (city, country, avg_aqi, min_aqi, max_aqi, observation_count)
        SELECT
            city,
            MAX(country) as country,
            AVG(aqi)::DOUBLE PRECISION as avg_aqi,
            MIN(aqi) as min_aqi,
            MAX(aqi) as max_aqi,
            COUNT(*) as observation_count
        FROM city_observations
        WHERE aqi IS NOT NULL
        GROUP BY city
        ON CONFLICT (city) DO UPDATE SET
            country = EXCLUDED.country,
            avg_aqi = EXCLUDED.avg_aqi,
            min_aqi = EXCLUDED.min_aqi,
            max_aqi = EXCLUDED.max_aqi,
            observation_count = EXCLUDED.observation_count
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn load_city_summaries(pool: &PgPool) -> Result<Vec<CitySummary>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, CitySummary>(
        r#"
        SELECT city, country, avg_aqi, min_aqi, max_aqi, observation_count
        FROM city_summary
        ORDER BY avg_aqi DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_resolve_cities_uses_request() {
        // ---
        let defaults = vec!["london".to_string()];
        assert_eq!(
            resolve_cities(Some("Paris, Tokyo"), &defaults),
            vec!["paris", "tokyo"]
        );
    }

    #[test]
    fn test_resolve_cities_falls_back_to_defaults() {
        // ---
        let defaults = vec!["london".to_string(), "paris".to_string()];
        assert_eq!(resolve_cities(None, &defaults), defaults);
        assert_eq!(resolve_cities(Some(" , "), &defaults), defaults);
    }

    #[test]
    fn test_refresh_flag_accepts_common_spellings() {
        // ---
        for raw in ["true", "TRUE", "1", "yes", " on "] {
            assert!(is_truthy(Some(raw)), "{:?} should enable refresh", raw);
        }
        for raw in ["false", "0", "no", "", "maybe"] {
            assert!(!is_truthy(Some(raw)), "{:?} should not enable refresh", raw);
        }
        assert!(!is_truthy(None));
    }

    #[test]
    fn test_refresh_query_never_rejects_request() {
        // ---
        use axum::extract::Query;
        use axum::http::Uri;

        for query in ["refresh=1", "refresh=yes", "refresh=bogus", "cities=london&refresh=true"] {
            let uri: Uri = format!("http://localhost/cities?{}", query).parse().unwrap();
            let Query(params) = Query::<CitiesQuery>::try_from_uri(&uri)
                .unwrap_or_else(|e| panic!("query {:?} rejected: {}", query, e));
            assert!(params.refresh.is_some());
        }
    }
}
