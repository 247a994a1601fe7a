//! PM2.5 to Air Quality Index conversion.
//!
//! A reading flows one way through two pure steps:
//! concentration → index ([`pm25_to_aqi`]) → category ([`AqiCategory::from_index`]).
//! A missing reading stays missing at every step and ends up as
//! [`AqiCategory::NoData`]; nothing here can fail.

use serde::Serialize;

// ---

/// One piecewise-linear segment of the PM2.5 → AQI mapping.
struct Band {
    // ---
    /// Readings `<= upper` fall in this band (checked in ascending order).
    upper: f64,
    in_lo: f64,
    in_hi: f64,
    out_lo: f64,
    out_hi: f64,
}

impl Band {
    // ---
    /// Linear interpolation, truncated toward zero.
    fn interpolate(&self, value: f64) -> i32 {
        // ---
        let slope = (self.out_hi - self.out_lo) / (self.in_hi - self.in_lo);
        (slope * (value - self.in_lo) + self.out_lo) as i32
    }
}

// The lower anchors (12.1, 35.5, ...) leave small gaps after the previous
// band's upper bound. Readings inside a gap interpolate just below out_lo.
static BANDS: [Band; 5] = [
    Band { upper: 12.0, in_lo: 0.0, in_hi: 12.0, out_lo: 0.0, out_hi: 50.0 },
    Band { upper: 35.4, in_lo: 12.1, in_hi: 35.4, out_lo: 51.0, out_hi: 100.0 },
    Band { upper: 55.4, in_lo: 35.5, in_hi: 55.4, out_lo: 101.0, out_hi: 150.0 },
    Band { upper: 150.4, in_lo: 55.5, in_hi: 150.4, out_lo: 151.0, out_hi: 200.0 },
    Band { upper: 250.4, in_lo: 150.5, in_hi: 250.4, out_lo: 201.0, out_hi: 300.0 },
];

/// Open-ended top band; the formula keeps climbing past 400.
static TOP_BAND: Band = Band {
    upper: f64::INFINITY,
    in_lo: 250.5,
    in_hi: 350.4,
    out_lo: 301.0,
    out_hi: 400.0,
};

/// Convert a PM2.5 concentration (µg/m³) to an AQI value.
///
/// Returns `None` for a missing reading. NaN and infinite readings count
/// as missing.
pub fn pm25_to_aqi(pm25: Option<f64>) -> Option<i32> {
    // ---
    let value = pm25.filter(|v| v.is_finite())?;
    let band = BANDS
        .iter()
        .find(|band| value <= band.upper)
        .unwrap_or(&TOP_BAND);

    Some(band.interpolate(value))
}

// ---

/// Severity category of an AQI value, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AqiCategory {
    #[serde(rename = "No Data")]
    NoData,
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "Unhealthy for Sensitive Groups")]
    UnhealthyForSensitiveGroups,
    #[serde(rename = "Unhealthy")]
    Unhealthy,
    #[serde(rename = "Very Unhealthy")]
    VeryUnhealthy,
    #[serde(rename = "Hazardous")]
    Hazardous,
}

impl AqiCategory {
    // ---
    /// All categories that correspond to an actual index, least severe first.
    pub const RANKED: [AqiCategory; 6] = [
        AqiCategory::Good,
        AqiCategory::Moderate,
        AqiCategory::UnhealthyForSensitiveGroups,
        AqiCategory::Unhealthy,
        AqiCategory::VeryUnhealthy,
        AqiCategory::Hazardous,
    ];

    /// Categorize an AQI value. Thresholds are inclusive upper bounds.
    pub fn from_index(aqi: Option<i32>) -> Self {
        // ---
        match aqi {
            None => AqiCategory::NoData,
            Some(v) if v <= 50 => AqiCategory::Good,
            Some(v) if v <= 100 => AqiCategory::Moderate,
            Some(v) if v <= 150 => AqiCategory::UnhealthyForSensitiveGroups,
            Some(v) if v <= 200 => AqiCategory::Unhealthy,
            Some(v) if v <= 300 => AqiCategory::VeryUnhealthy,
            Some(_) => AqiCategory::Hazardous,
        }
    }

    pub fn label(self) -> &'static str {
        // ---
        match self {
            AqiCategory::NoData => "No Data",
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    /// Display color as a `#RRGGBB` hex string.
    pub fn color(self) -> &'static str {
        // ---
        match self {
            AqiCategory::NoData => "#CCCCCC",
            AqiCategory::Good => "#00E400",
            AqiCategory::Moderate => "#FFFF00",
            AqiCategory::UnhealthyForSensitiveGroups => "#FF7E00",
            AqiCategory::Unhealthy => "#FF0000",
            AqiCategory::VeryUnhealthy => "#8F3F97",
            AqiCategory::Hazardous => "#7E0023",
        }
    }

    pub fn recommendation(self) -> &'static str {
        // ---
        match self {
            AqiCategory::NoData => "No data available",
            AqiCategory::Good => "🟢 Great day for outdoor activities!",
            AqiCategory::Moderate => {
                "🟡 Generally safe, but sensitive people should consider reducing prolonged outdoor exertion"
            }
            AqiCategory::UnhealthyForSensitiveGroups => {
                "🟠 Sensitive groups should reduce outdoor activities"
            }
            AqiCategory::Unhealthy => "🔴 Everyone should limit outdoor activities",
            AqiCategory::VeryUnhealthy => "🟣 Avoid outdoor activities - health alert!",
            AqiCategory::Hazardous => "⚫ Emergency conditions - stay indoors!",
        }
    }
}

impl std::fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---

/// Everything derived from a single PM2.5 reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AqiAssessment {
    // ---
    pub pm25: Option<f64>,
    pub aqi: Option<i32>,
    pub category: AqiCategory,
    pub color: &'static str,
    pub recommendation: &'static str,
}

/// Run a reading through the whole conversion chain.
pub fn assess_pm25(pm25: Option<f64>) -> AqiAssessment {
    // ---
    let aqi = pm25_to_aqi(pm25);
    let category = AqiCategory::from_index(aqi);

    AqiAssessment {
        pm25: pm25.filter(|v| v.is_finite()),
        aqi,
        category,
        color: category.color(),
        recommendation: category.recommendation(),
    }
}
