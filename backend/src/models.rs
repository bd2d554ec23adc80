use serde::{Deserialize, Serialize};

pub use shared::{
    ApiError, CityBreakdownEntry, CompareRequest, CompareResponse, Coordinate, FuelComparison,
    Numeric, RouteRequest, RouteResponse, SegmentInput, SegmentRow, SegmentsRequest,
    SegmentsResponse,
};

pub const FLIGHT: &str = "flight";
pub const WALK: &str = "walk";

/// Vehicle and load description shared by every segment of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionProfile {
    pub vehicle_type: String,
    pub fuel_type: String,
    pub terrain: String,
    pub road_type: String,
    pub load_weight_ton: f64,
}

impl EmissionProfile {
    pub fn is_flight(&self) -> bool {
        self.vehicle_type.eq_ignore_ascii_case(FLIGHT)
    }
}

/// Travel modes understood by the routing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TravelMode {
    Drive,
    Bicycle,
    Walk,
    Transit,
}

impl TravelMode {
    pub fn for_vehicle(vehicle_type: &str) -> Self {
        match vehicle_type.to_ascii_lowercase().as_str() {
            "car" | "truck" => TravelMode::Drive,
            "bike" => TravelMode::Bicycle,
            WALK => TravelMode::Walk,
            FLIGHT => TravelMode::Transit,
            _ => TravelMode::Drive,
        }
    }
}
