//! End-to-end checks against a running server.
//!
//! Start the service first, then run `cargo test -- --ignored`.
//! `BASE_URL` defaults to `http://localhost:8080`.

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AqiAssessment {
    aqi: Option<i32>,
    category: String,
    color: String,
    recommendation: String,
}

#[derive(Debug, Deserialize)]
struct CityAirQuality {
    city: String,
    query_city: String,
    aqi: Option<i32>,
    aqi_category: String,
}

#[derive(Debug, Deserialize)]
struct RankedCity {
    aqi: i32,
}

#[derive(Debug, Deserialize)]
struct Summary {
    cities_monitored: usize,
}

#[derive(Debug, Deserialize)]
struct Report {
    summary: Summary,
    ranking: Vec<RankedCity>,
}

#[derive(Debug, Deserialize)]
struct CitiesResponse {
    cities: Vec<CityAirQuality>,
    report: Report,
}

fn base_url() -> String {
    // ---
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into())
}

/// Category thresholds, restated so the server is checked independently.
fn expected_category(aqi: Option<i32>) -> &'static str {
    // ---
    match aqi {
        None => "No Data",
        Some(v) if v <= 50 => "Good",
        Some(v) if v <= 100 => "Moderate",
        Some(v) if v <= 150 => "Unhealthy for Sensitive Groups",
        Some(v) if v <= 200 => "Unhealthy",
        Some(v) if v <= 300 => "Very Unhealthy",
        Some(_) => "Hazardous",
    }
}

#[tokio::test]
#[ignore = "requires a running server at BASE_URL"]
async fn aqi_endpoint_converts_readings() -> Result<()> {
    // ---
    let client = Client::new();

    let cases = [
        ("10", Some(41), "Good"),
        ("12", Some(50), "Good"),
        ("12.1", Some(51), "Moderate"),
        ("40", Some(112), "Unhealthy for Sensitive Groups"),
        ("300", Some(350), "Hazardous"),
    ];

    for (pm25, aqi, category) in cases {
        let url = format!("{}/aqi?pm25={}", base_url(), pm25);
        let body: AqiAssessment = client.get(&url).send().await?.json().await?;

        assert_eq!(body.aqi, aqi, "pm25={}", pm25);
        assert_eq!(body.category, category, "pm25={}", pm25);
        assert!(body.color.starts_with('#'));
        assert!(!body.recommendation.is_empty());
    }

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running server at BASE_URL"]
async fn aqi_endpoint_missing_reading_is_no_data() -> Result<()> {
    // ---
    let client = Client::new();

    for url in [
        format!("{}/aqi", base_url()),
        format!("{}/aqi?pm25=abc", base_url()),
    ] {
        let body: AqiAssessment = client.get(&url).send().await?.json().await?;
        assert_eq!(body.aqi, None);
        assert_eq!(body.category, "No Data");
        assert_eq!(body.color, "#CCCCCC");
        assert_eq!(body.recommendation, "No data available");
    }

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running server and WAQI access"]
async fn cities_endpoint_categorizes_and_ranks() -> Result<()> {
    // ---
    let url = format!("{}/cities?cities=london,paris,tokyo", base_url());
    let client = Client::new();
    let body: CitiesResponse = client.get(&url).send().await?.json().await?;

    assert!(!body.cities.is_empty(), "No cities returned from {}", url);

    for c in &body.cities {
        assert!(!c.city.is_empty(), "city should not be empty");
        assert!(
            ["london", "paris", "tokyo"].contains(&c.query_city.as_str()),
            "unexpected query city {}",
            c.query_city
        );
        assert_eq!(
            c.aqi_category,
            expected_category(c.aqi),
            "category wrong for {} (aqi={:?})",
            c.city,
            c.aqi
        );
    }

    let rated = body.cities.iter().filter(|c| c.aqi.is_some()).count();
    assert_eq!(body.report.summary.cities_monitored, rated);

    // Ranking is worst first
    for pair in body.report.ranking.windows(2) {
        assert!(pair[0].aqi >= pair[1].aqi, "ranking out of order");
    }

    Ok(())
}
