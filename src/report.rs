//! Summary metrics and rankings over a snapshot of city records.

use serde::Serialize;

use crate::aqi::AqiCategory;
use crate::models::{CityAirQuality, PollutantReading};

// ---

/// Pollutants shown in the side-by-side comparison.
pub const COMPARED_POLLUTANTS: [&str; 6] = ["pm25", "pm10", "no2", "so2", "co", "o3"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCity {
    // ---
    pub city: String,
    pub aqi: i32,
    pub aqi_category: AqiCategory,
    pub health_recommendation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    // ---
    pub cities_monitored: usize,
    pub average_aqi: Option<f64>,
    pub best: Option<RankedCity>,
    pub worst: Option<RankedCity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    // ---
    pub category: AqiCategory,
    pub color: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    // ---
    pub summary: Summary,
    /// Worst air first.
    pub ranking: Vec<RankedCity>,
    pub category_distribution: Vec<CategoryCount>,
    pub pollutant_comparison: Vec<PollutantReading>,
}

/// Build the report. Cities without an overall AQI are left out of the
/// summary, ranking and distribution.
pub fn build_report(cities: &[CityAirQuality], pollutants: &[PollutantReading]) -> Report {
    // ---
    let rated: Vec<RankedCity> = cities
        .iter()
        .filter_map(|c| {
            c.aqi.map(|aqi| RankedCity {
                city: c.city.clone(),
                aqi,
                aqi_category: c.aqi_category,
                health_recommendation: c.health_recommendation,
            })
        })
        .collect();

    let average_aqi = if rated.is_empty() {
        None
    } else {
        let total: f64 = rated.iter().map(|c| c.aqi as f64).sum();
        Some(total / rated.len() as f64)
    };

    // First occurrence wins on ties
    let best = rated
        .iter()
        .fold(None::<&RankedCity>, |acc, c| match acc {
            Some(b) if b.aqi <= c.aqi => Some(b),
            _ => Some(c),
        })
        .cloned();
    let worst = rated
        .iter()
        .fold(None::<&RankedCity>, |acc, c| match acc {
            Some(w) if w.aqi >= c.aqi => Some(w),
            _ => Some(c),
        })
        .cloned();

    let category_distribution = AqiCategory::RANKED
        .iter()
        .map(|&category| CategoryCount {
            category,
            color: category.color(),
            count: rated.iter().filter(|c| c.aqi_category == category).count(),
        })
        .filter(|c| c.count > 0)
        .collect();

    let mut ranking = rated.clone();
    ranking.sort_by(|a, b| b.aqi.cmp(&a.aqi));

    let pollutant_comparison = pollutants
        .iter()
        .filter(|p| COMPARED_POLLUTANTS.contains(&p.parameter.as_str()))
        .cloned()
        .collect();

    Report {
        summary: Summary {
            cities_monitored: rated.len(),
            average_aqi,
            best,
            worst,
        },
        ranking,
        category_distribution,
        pollutant_comparison,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::CityFeed;
    use serde_json::json;

    fn city(name: &str, aqi: Option<i32>) -> CityAirQuality {
        // ---
        let feed: CityFeed = serde_json::from_value(json!({
            "aqi": aqi,
            "city": { "name": name },
        }))
        .unwrap();
        feed.to_city_record(&name.to_lowercase())
    }

    fn pollutant(parameter: &str) -> PollutantReading {
        // ---
        PollutantReading {
            city: "Paris".to_string(),
            query_city: "paris".to_string(),
            parameter: parameter.to_string(),
            value: Some(1.0),
            unit: "AQI",
        }
    }

    #[test]
    fn test_summary_metrics() {
        // ---
        let cities = vec![
            city("London", Some(40)),
            city("Delhi", Some(180)),
            city("Paris", Some(60)),
            city("Atlantis", None),
        ];
        let report = build_report(&cities, &[]);

        assert_eq!(report.summary.cities_monitored, 3);
        let avg = report.summary.average_aqi.unwrap();
        assert!((avg - 93.333).abs() < 0.01, "avg={}", avg);
        assert_eq!(report.summary.best.unwrap().city, "London");
        assert_eq!(report.summary.worst.unwrap().city, "Delhi");
    }

    #[test]
    fn test_ranking_is_worst_first() {
        // ---
        let cities = vec![
            city("London", Some(40)),
            city("Delhi", Some(180)),
            city("Paris", Some(60)),
        ];
        let report = build_report(&cities, &[]);
        let order: Vec<&str> = report.ranking.iter().map(|c| c.city.as_str()).collect();

        assert_eq!(order, vec!["Delhi", "Paris", "London"]);
    }

    #[test]
    fn test_ties_keep_first_city() {
        // ---
        let cities = vec![city("A", Some(70)), city("B", Some(70))];
        let report = build_report(&cities, &[]);

        assert_eq!(report.summary.best.unwrap().city, "A");
        assert_eq!(report.summary.worst.unwrap().city, "A");
    }

    #[test]
    fn test_category_distribution() {
        // ---
        let cities = vec![
            city("A", Some(10)),
            city("B", Some(45)),
            city("C", Some(350)),
            city("D", None),
        ];
        let report = build_report(&cities, &[]);

        assert_eq!(
            report.category_distribution,
            vec![
                CategoryCount {
                    category: AqiCategory::Good,
                    color: "#00E400",
                    count: 2
                },
                CategoryCount {
                    category: AqiCategory::Hazardous,
                    color: "#7E0023",
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_pollutant_comparison_filter() {
        // ---
        let pollutants = vec![pollutant("pm25"), pollutant("t"), pollutant("o3"), pollutant("h")];
        let report = build_report(&[], &pollutants);
        let params: Vec<&str> = report
            .pollutant_comparison
            .iter()
            .map(|p| p.parameter.as_str())
            .collect();

        assert_eq!(params, vec!["pm25", "o3"]);
    }

    #[test]
    fn test_empty_snapshot() {
        // ---
        let report = build_report(&[], &[]);

        assert_eq!(report.summary.cities_monitored, 0);
        assert_eq!(report.summary.average_aqi, None);
        assert!(report.summary.best.is_none());
        assert!(report.ranking.is_empty());
        assert!(report.category_distribution.is_empty());
    }
}
