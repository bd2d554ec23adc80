use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A number that clients may send either as JSON number or as numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Number(value) => Some(*value),
            Numeric::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Numeric::Number(value)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentInput {
    pub city: Option<String>,
    pub distance: Option<Numeric>,
    pub load_weight: Option<Numeric>,
    pub terrain: Option<String>,
    pub road_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentsRequest {
    pub vehicle_type: Option<String>,
    pub fuel_type: Option<String>,
    #[serde(default)]
    pub segments: Vec<SegmentInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRow {
    pub city: String,
    pub distance_km: f64,
    pub load_weight_ton: f64,
    #[serde(rename = "TTW_kg")]
    pub ttw_kg: f64,
    #[serde(rename = "WTT_kg")]
    pub wtt_kg: f64,
    #[serde(rename = "WTW_kg")]
    pub wtw_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentsResponse {
    pub vehicle_type: String,
    pub fuel_type: String,
    pub results: Vec<SegmentRow>,
    #[serde(rename = "total_TTW_kg")]
    pub total_ttw_kg: f64,
    #[serde(rename = "total_WTT_kg")]
    pub total_wtt_kg: f64,
    #[serde(rename = "total_WTW_kg")]
    pub total_wtw_kg: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start: Option<Coordinate>,
    pub end: Option<Coordinate>,
    pub vehicle_type: Option<String>,
    pub fuel_type: Option<String>,
    pub load_weight_ton: Option<Numeric>,
    pub road_type: Option<String>,
    pub terrain: Option<String>,
}

/// Cumulative route totals recorded when a city is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityBreakdownEntry {
    pub city: String,
    pub distance_km: f64,
    #[serde(rename = "TTW_kg")]
    pub ttw_kg: f64,
    #[serde(rename = "WTT_kg")]
    pub wtt_kg: f64,
    #[serde(rename = "WTW_kg")]
    pub wtw_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub start: Coordinate,
    pub end: Coordinate,
    pub distance_km: f64,
    pub duration_hours: f64,
    #[serde(rename = "TTW_kg")]
    pub ttw_kg: f64,
    #[serde(rename = "WTT_kg")]
    pub wtt_kg: f64,
    #[serde(rename = "WTW_kg")]
    pub wtw_kg: f64,
    pub city_breakdown: Vec<CityBreakdownEntry>,
    pub path: Vec<Coordinate>,
    #[serde(default)]
    pub gpx_base64: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompareRequest {
    pub baseline_fuel: Option<String>,
    pub baseline_emission: Option<Numeric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelComparison {
    pub emission_kg: f64,
    pub diff_kg: String,
    pub percent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResponse {
    pub baseline: String,
    pub baseline_emission: f64,
    pub comparisons: BTreeMap<String, FuelComparison>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
