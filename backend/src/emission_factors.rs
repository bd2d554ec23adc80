use std::{collections::HashMap, fs::File, io, io::Read, path::Path};

use serde::{Deserialize, Serialize};

use crate::models::FLIGHT;

/// Terrain and road keys used for the single flight entry.
const FLIGHT_DEFAULT_KEY: &str = "default";

/// (vehicle, fuel, terrain, road_type, TTW, WTT) in kg CO2e per km per ton.
const BUILTIN_FACTORS: &[(&str, &str, &str, &str, f64, f64)] = &[
    ("truck", "diesel", "flat", "highway", 0.13, 0.03),
    ("truck", "diesel", "flat", "city", 0.12, 0.028),
    ("truck", "diesel", "hilly", "highway", 0.15, 0.035),
    ("truck", "diesel", "hilly", "city", 0.14, 0.032),
    ("truck", "petrol", "flat", "highway", 0.12, 0.025),
    ("truck", "petrol", "flat", "city", 0.11, 0.023),
    ("truck", "petrol", "hilly", "highway", 0.14, 0.03),
    ("truck", "petrol", "hilly", "city", 0.13, 0.028),
    ("truck", "electric", "flat", "highway", 0.01, 0.015),
    ("truck", "electric", "flat", "city", 0.009, 0.013),
    ("truck", "electric", "hilly", "highway", 0.012, 0.017),
    ("truck", "electric", "hilly", "city", 0.011, 0.016),
    ("car", "diesel", "flat", "highway", 0.09, 0.02),
    ("car", "diesel", "flat", "city", 0.08, 0.018),
    ("car", "diesel", "hilly", "highway", 0.10, 0.022),
    ("car", "diesel", "hilly", "city", 0.09, 0.02),
    ("car", "petrol", "flat", "highway", 0.08, 0.018),
    ("car", "petrol", "flat", "city", 0.07, 0.016),
    ("car", "petrol", "hilly", "highway", 0.09, 0.02),
    ("car", "petrol", "hilly", "city", 0.08, 0.018),
    ("car", "electric", "flat", "highway", 0.005, 0.010),
    ("car", "electric", "flat", "city", 0.0045, 0.009),
    ("car", "electric", "hilly", "highway", 0.006, 0.012),
    ("car", "electric", "hilly", "city", 0.0055, 0.011),
    ("bike", "petrol", "flat", "highway", 0.05, 0.012),
    ("bike", "petrol", "flat", "city", 0.045, 0.011),
    ("bike", "petrol", "hilly", "highway", 0.055, 0.014),
    ("bike", "petrol", "hilly", "city", 0.05, 0.013),
    ("bike", "electric", "flat", "highway", 0.003, 0.008),
    ("bike", "electric", "flat", "city", 0.0025, 0.0075),
    ("bike", "electric", "hilly", "highway", 0.0035, 0.009),
    ("bike", "electric", "hilly", "city", 0.003, 0.0085),
    (FLIGHT, "JetFuel", FLIGHT_DEFAULT_KEY, FLIGHT_DEFAULT_KEY, 0.55, 0.16),
];

#[derive(Debug, thiserror::Error)]
pub enum FactorTableError {
    #[error("failed to read emission factor file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid emission factor table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Coefficient pair in kg CO2e per km per ton.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactors {
    #[serde(rename = "TTW")]
    pub ttw: f64,
    #[serde(rename = "WTT")]
    pub wtt: f64,
}

impl EmissionFactors {
    pub const ZERO: Self = Self { ttw: 0.0, wtt: 0.0 };

    pub fn is_zero(&self) -> bool {
        self.ttw == 0.0 && self.wtt == 0.0
    }
}

/// Emissions of one segment, each component rounded to 2 decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SegmentEmissions {
    pub ttw_kg: f64,
    pub wtt_kg: f64,
}

impl SegmentEmissions {
    /// Sum of the already rounded TTW and WTT parts.
    pub fn wtw_kg(&self) -> f64 {
        round2(self.ttw_kg + self.wtt_kg)
    }
}

type RoadTable = HashMap<String, EmissionFactors>;
type TerrainTable = HashMap<String, RoadTable>;
type FuelTable = HashMap<String, TerrainTable>;

/// Nested vehicle -> fuel -> terrain -> road type lookup table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmissionFactorTable {
    vehicles: HashMap<String, FuelTable>,
}

impl EmissionFactorTable {
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for &(vehicle, fuel, terrain, road, ttw, wtt) in BUILTIN_FACTORS {
            table.insert(vehicle, fuel, terrain, road, EmissionFactors { ttw, wtt });
        }
        table
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FactorTableError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, FactorTableError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn insert(
        &mut self,
        vehicle: &str,
        fuel: &str,
        terrain: &str,
        road_type: &str,
        factors: EmissionFactors,
    ) {
        self.vehicles
            .entry(vehicle.to_string())
            .or_default()
            .entry(fuel.to_string())
            .or_default()
            .entry(terrain.to_string())
            .or_default()
            .insert(road_type.to_string(), factors);
    }

    /// Looks up the factor pair for a combination.
    ///
    /// Flights ignore `terrain` and `road_type`. An unsupported combination
    /// yields [`EmissionFactors::ZERO`]; callers must read zero as
    /// "unsupported", not as a zero-emission vehicle.
    pub fn lookup(
        &self,
        vehicle_type: &str,
        fuel_type: &str,
        terrain: &str,
        road_type: &str,
    ) -> EmissionFactors {
        let (terrain, road_type) = if vehicle_type == FLIGHT {
            (FLIGHT_DEFAULT_KEY, FLIGHT_DEFAULT_KEY)
        } else {
            (terrain, road_type)
        };

        match self.get(vehicle_type, fuel_type, terrain, road_type) {
            Some(factors) => factors,
            None => {
                tracing::warn!(
                    "no emission factors for vehicle={vehicle_type} fuel={fuel_type} terrain={terrain} road_type={road_type}"
                );
                EmissionFactors::ZERO
            }
        }
    }

    fn get(&self, vehicle: &str, fuel: &str, terrain: &str, road: &str) -> Option<EmissionFactors> {
        self.vehicles
            .get(vehicle)?
            .get(fuel)?
            .get(terrain)?
            .get(road)
            .copied()
    }
}

/// Applies a factor pair to one segment.
pub fn compute(factors: EmissionFactors, distance_km: f64, load_weight_ton: f64) -> SegmentEmissions {
    SegmentEmissions {
        ttw_kg: round2(factors.ttw * distance_km * load_weight_ton),
        wtt_kg: round2(factors.wtt * distance_km * load_weight_ton),
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
