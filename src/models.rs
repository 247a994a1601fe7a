//! Data models for WAQI city feeds and the records derived from them.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::aqi::AqiCategory;

// ---

/// Parameter name used for the fallback row of a feed without pollutants.
pub const OVERALL_AQI: &str = "overall_aqi";

/// Timestamp format of the WAQI `time.s` field (station local time).
const FEED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Top-level WAQI response. `data` is an object when `status` is `"ok"` and
/// an error message string otherwise.
#[derive(Debug, Deserialize)]
pub struct FeedEnvelope {
    // ---
    pub status: String,
    #[serde(default)]
    pub data: Value,
}

/// Raw city feed from the WAQI API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CityFeed {
    // ---
    #[serde(default, deserialize_with = "lenient_aqi")]
    pub aqi: Option<i32>,
    #[serde(default)]
    pub city: FeedCity,
    #[serde(default)]
    pub time: FeedTime,
    #[serde(default)]
    pub iaqi: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedCity {
    // ---
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub geo: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedTime {
    // ---
    pub s: Option<String>,
}

/// WAQI reports `"-"` when a station has no current index.
fn lenient_aqi<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value).map(|v| v as i32))
}

/// Accept JSON numbers and numeric strings; anything else is no data.
fn number_from_value(value: &Value) -> Option<f64> {
    // ---
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

// ---

/// One row per city for the API response and the `city_observations` table.
#[derive(Debug, Clone, Serialize)]
pub struct CityAirQuality {
    // ---
    pub city: String,
    pub query_city: String,
    pub country: String,
    pub aqi: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub observed_at: Option<NaiveDateTime>,
    pub url: Option<String>,
    pub aqi_category: AqiCategory,
    pub color: &'static str,
    pub health_recommendation: &'static str,
}

/// One row per pollutant reported by a city feed.
#[derive(Debug, Clone, Serialize)]
pub struct PollutantReading {
    // ---
    pub city: String,
    pub query_city: String,
    pub parameter: String,
    pub value: Option<f64>,
    pub unit: &'static str,
}

/// Per-city aggregate read back from the `city_summary` table
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CitySummary {
    // ---
    pub city: String,
    pub country: String,
    pub avg_aqi: f64,
    pub min_aqi: i32,
    pub max_aqi: i32,
    pub observation_count: i64,
}

/// Transformation helpers
impl CityFeed {
    // ---
    pub fn city_name(&self) -> String {
        // ---
        self.city
            .name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Country is whatever follows the last comma of the station name.
    pub fn country(&self) -> String {
        // ---
        match self.city.name.as_deref() {
            Some(name) if name.contains(',') => name
                .rsplit(',')
                .next()
                .map(|c| c.trim().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            _ => "Unknown".to_string(),
        }
    }

    fn coordinates(&self) -> (Option<f64>, Option<f64>) {
        // ---
        if self.city.geo.len() < 2 {
            return (None, None);
        }
        (
            number_from_value(&self.city.geo[0]),
            number_from_value(&self.city.geo[1]),
        )
    }

    pub fn to_city_record(&self, query_city: &str) -> CityAirQuality {
        // ---
        let (latitude, longitude) = self.coordinates();
        let observed_at = self
            .time
            .s
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, FEED_TIME_FORMAT).ok());
        let category = AqiCategory::from_index(self.aqi);

        CityAirQuality {
            city: self.city_name(),
            query_city: query_city.to_string(),
            country: self.country(),
            aqi: self.aqi,
            latitude,
            longitude,
            observed_at,
            url: self.city.url.clone(),
            aqi_category: category,
            color: category.color(),
            health_recommendation: category.recommendation(),
        }
    }

    /// Flatten `iaqi` into pollutant rows. A feed that reports no pollutants
    /// but has an overall index yields a single `overall_aqi` row.
    pub fn to_pollutant_readings(&self, query_city: &str) -> Vec<PollutantReading> {
        // ---
        let city = self.city_name();
        let row = |parameter: &str, value: Option<f64>| PollutantReading {
            city: city.clone(),
            query_city: query_city.to_string(),
            parameter: parameter.to_string(),
            value,
            unit: "AQI",
        };

        let mut rows: Vec<PollutantReading> = self
            .iaqi
            .iter()
            .filter_map(|(pollutant, data)| {
                let v = data.as_object()?.get("v")?;
                Some(row(pollutant, number_from_value(v)))
            })
            .collect();

        if rows.is_empty() {
            if let Some(aqi) = self.aqi {
                rows.push(row(OVERALL_AQI, Some(aqi as f64)));
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn london_feed() -> CityFeed {
        // ---
        serde_json::from_value(json!({
            "aqi": 42,
            "idx": 5724,
            "city": {
                "geo": [51.5073509, -0.1277583],
                "name": "London, UK",
                "url": "https://aqicn.org/city/london"
            },
            "iaqi": {
                "pm25": { "v": 42 },
                "no2": { "v": 12.3 },
                "t": { "v": 17 },
                "dominentpol": "pm25"
            },
            "time": { "s": "2025-03-26 18:00:00", "tz": "+00:00" }
        }))
        .unwrap()
    }

    #[test]
    fn test_city_record_fields() {
        // ---
        let record = london_feed().to_city_record("london");

        assert_eq!(record.city, "London, UK");
        assert_eq!(record.query_city, "london");
        assert_eq!(record.country, "UK");
        assert_eq!(record.aqi, Some(42));
        assert_eq!(record.latitude, Some(51.5073509));
        assert_eq!(record.longitude, Some(-0.1277583));
        assert_eq!(record.url.as_deref(), Some("https://aqicn.org/city/london"));
        assert_eq!(record.aqi_category, AqiCategory::Good);
        assert_eq!(record.color, "#00E400");

        let observed = record.observed_at.unwrap();
        assert_eq!(observed.year(), 2025);
        assert_eq!(observed.hour(), 18);
    }

    #[test]
    fn test_pollutant_rows_skip_non_readings() {
        // ---
        let rows = london_feed().to_pollutant_readings("london");
        let params: Vec<&str> = rows.iter().map(|r| r.parameter.as_str()).collect();

        // BTreeMap keeps the pollutant order stable
        assert_eq!(params, vec!["no2", "pm25", "t"]);
        assert_eq!(rows[0].value, Some(12.3));
        assert!(rows.iter().all(|r| r.unit == "AQI"));
    }

    #[test]
    fn test_overall_row_when_no_pollutants() {
        // ---
        let feed: CityFeed = serde_json::from_value(json!({
            "aqi": 160,
            "city": { "name": "Delhi" },
            "iaqi": {}
        }))
        .unwrap();

        let rows = feed.to_pollutant_readings("delhi");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].parameter, OVERALL_AQI);
        assert_eq!(rows[0].value, Some(160.0));

        let record = feed.to_city_record("delhi");
        assert_eq!(record.country, "Unknown");
        assert_eq!(record.aqi_category, AqiCategory::Unhealthy);
    }

    #[test]
    fn test_missing_index_is_no_data() {
        // ---
        let feed: CityFeed = serde_json::from_value(json!({
            "aqi": "-",
            "city": { "name": "Nowhere, XX", "geo": [] },
            "time": { "s": "not a date" }
        }))
        .unwrap();

        let record = feed.to_city_record("nowhere");
        assert_eq!(record.aqi, None);
        assert_eq!(record.aqi_category, AqiCategory::NoData);
        assert_eq!(record.health_recommendation, "No data available");
        assert_eq!(record.latitude, None);
        assert_eq!(record.observed_at, None);
        assert!(feed.to_pollutant_readings("nowhere").is_empty());
    }

    #[test]
    fn test_empty_feed_defaults() {
        // ---
        let feed: CityFeed = serde_json::from_value(json!({})).unwrap();
        let record = feed.to_city_record("x");

        assert_eq!(record.city, "Unknown");
        assert_eq!(record.country, "Unknown");
        assert_eq!(record.url, None);
    }
}
