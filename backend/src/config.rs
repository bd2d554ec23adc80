use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;

use crate::{
    attribution::CityTotalsPolicy,
    emission_factors::{EmissionFactorTable, FactorTableError},
    engine::{EngineSettings, FLIGHT_CRUISE_KMH},
    geocoding::NOMINATIM_REVERSE_URL,
    routing::GOOGLE_ROUTES_URL,
    simplify::{DEFAULT_EPSILON_DEG, DEFAULT_MAX_POINTS},
};

#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Estimate journey emissions and attribute them to the cities on the route"
)]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "GREENROUTE_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,

    /// Google Routes API key
    #[arg(long, env = "GOOGLE_API_KEY", default_value = "", hide_env_values = true)]
    pub google_api_key: String,

    #[arg(long, env = "GOOGLE_ROUTES_URL", default_value = GOOGLE_ROUTES_URL)]
    pub routes_url: String,

    #[arg(long, env = "NOMINATIM_URL", default_value = NOMINATIM_REVERSE_URL)]
    pub nominatim_url: String,

    /// Contact address sent in the User-Agent, required by the Nominatim usage policy
    #[arg(long, env = "CONTACT_EMAIL", default_value = "")]
    pub contact_email: String,

    /// JSON file replacing the built-in emission factor table
    #[arg(long, env = "EMISSION_FACTORS")]
    pub emission_factors: Option<PathBuf>,

    /// Douglas-Peucker tolerance in degrees
    #[arg(long, default_value_t = DEFAULT_EPSILON_DEG)]
    pub simplify_epsilon: f64,

    /// Waypoint cap after simplification; both route ends always count
    #[arg(long, default_value_t = DEFAULT_MAX_POINTS, value_parser = parse_max_points)]
    pub max_route_points: usize,

    /// How a revisited city's totals are reported
    #[arg(long, value_enum, default_value_t = CityTotalsPolicy::FirstSeen)]
    pub city_totals: CityTotalsPolicy,

    /// Timeout for each outbound provider request
    #[arg(long, default_value_t = 10)]
    pub request_timeout_secs: u64,

    #[arg(long, default_value_t = 1)]
    pub geocode_concurrency: usize,

    #[arg(long, default_value_t = 1024)]
    pub geocode_cache_size: usize,

    #[arg(long, default_value_t = FLIGHT_CRUISE_KMH)]
    pub flight_cruise_kmh: f64,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            simplify_epsilon: self.simplify_epsilon,
            max_route_points: self.max_route_points,
            city_totals: self.city_totals,
            geocode_concurrency: self.geocode_concurrency,
            flight_cruise_kmh: self.flight_cruise_kmh,
        }
    }

    pub fn load_factor_table(&self) -> Result<EmissionFactorTable, FactorTableError> {
        match &self.emission_factors {
            Some(path) => {
                let table = EmissionFactorTable::from_file(path)?;
                tracing::info!("loaded emission factors from {}", path.display());
                Ok(table)
            }
            None => Ok(EmissionFactorTable::builtin()),
        }
    }
}

fn parse_max_points(raw: &str) -> Result<usize, String> {
    let value: usize = raw.parse().map_err(|err| format!("{err}"))?;
    if value < 2 {
        return Err(format!("{value} is below 2, the start and destination"));
    }
    Ok(value)
}
