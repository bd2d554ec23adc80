use std::sync::Arc;

use crate::{
    accumulator::{RunningTotals, SegmentAccumulator},
    attribution::{build_breakdown, CityTotalsPolicy},
    emission_factors::{compute, round2, EmissionFactorTable, EmissionFactors},
    error::EngineError,
    geocoding::{resolve_cities, ReverseGeocoder},
    gpx_export::{encode_route_as_gpx, TrackSummary},
    models::{
        CityBreakdownEntry, Coordinate, EmissionProfile, Numeric, RouteRequest, RouteResponse,
        SegmentInput, SegmentRow, SegmentsRequest, SegmentsResponse, TravelMode, WALK,
    },
    routing::{decode_polyline, RoutingError, RoutingProvider},
    simplify::{simplify_route, DEFAULT_EPSILON_DEG, DEFAULT_MAX_POINTS},
};

pub const FLIGHT_CRUISE_KMH: f64 = 800.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub simplify_epsilon: f64,
    pub max_route_points: usize,
    pub city_totals: CityTotalsPolicy,
    pub geocode_concurrency: usize,
    pub flight_cruise_kmh: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            simplify_epsilon: DEFAULT_EPSILON_DEG,
            max_route_points: DEFAULT_MAX_POINTS,
            city_totals: CityTotalsPolicy::FirstSeen,
            geocode_concurrency: 1,
            flight_cruise_kmh: FLIGHT_CRUISE_KMH,
        }
    }
}

/// Route totals plus the per-city breakdown of one walked route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEmissions {
    pub totals: RunningTotals,
    pub city_breakdown: Vec<CityBreakdownEntry>,
}

/// Walks `path` once, attributing the running totals after each segment to
/// `cities[i]`, the city of the segment end point `path[i + 1]`.
pub fn attribute_route(
    path: &[Coordinate],
    cities: &[String],
    factors: EmissionFactors,
    load_weight_ton: f64,
    policy: CityTotalsPolicy,
) -> RouteEmissions {
    let mut accumulator = SegmentAccumulator::new(factors, load_weight_ton);
    let sightings: Vec<(&str, RunningTotals)> = accumulator
        .walk(path)
        .zip(cities)
        .map(|(step, city)| (city.as_str(), step.totals))
        .collect();
    let city_breakdown = build_breakdown(sightings, policy);

    RouteEmissions {
        totals: accumulator.totals(),
        city_breakdown,
    }
}

/// Flights use a fixed cruise speed, everything else the provider's estimate.
pub fn duration_hours(
    profile: &EmissionProfile,
    distance_km: f64,
    duration_seconds: i64,
    flight_cruise_kmh: f64,
) -> f64 {
    if profile.is_flight() {
        distance_km / flight_cruise_kmh
    } else {
        duration_seconds as f64 / SECONDS_PER_HOUR
    }
}

/// Emission calculator composing simplification, accumulation and city attribution.
///
/// External collaborators are injected once at startup and shared by every
/// request; the engine itself holds no per-request state.
pub struct EmissionEngine {
    factors: Arc<EmissionFactorTable>,
    router: Arc<dyn RoutingProvider>,
    geocoder: Arc<dyn ReverseGeocoder>,
    settings: EngineSettings,
}

impl EmissionEngine {
    pub fn new(
        factors: Arc<EmissionFactorTable>,
        router: Arc<dyn RoutingProvider>,
        geocoder: Arc<dyn ReverseGeocoder>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            factors,
            router,
            geocoder,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Pre-segmented mode: every segment is computed on its own, no geometry involved.
    pub fn calculate_segments(
        &self,
        req: &SegmentsRequest,
    ) -> Result<SegmentsResponse, EngineError> {
        let vehicle_type = required(req.vehicle_type.as_deref());
        let fuel_type = required(req.fuel_type.as_deref());
        let (Some(vehicle_type), Some(fuel_type)) = (vehicle_type, fuel_type) else {
            return Err(EngineError::invalid(
                "Missing required inputs: vehicle_type or fuel_type or segments",
            ));
        };
        if req.segments.is_empty() {
            return Err(EngineError::invalid(
                "Missing required inputs: vehicle_type or fuel_type or segments",
            ));
        }

        let mut results = Vec::with_capacity(req.segments.len());
        let mut total_ttw = 0.0;
        let mut total_wtt = 0.0;

        for (index, segment) in req.segments.iter().enumerate() {
            let segment = ParsedSegment::from_input(segment).map_err(|reason| {
                EngineError::invalid(format!("Invalid segment data at index {index}: {reason}"))
            })?;
            let factors =
                self.factors
                    .lookup(vehicle_type, fuel_type, segment.terrain, segment.road_type);
            let emissions = compute(factors, segment.distance_km, segment.load_weight_ton);
            total_ttw += emissions.ttw_kg;
            total_wtt += emissions.wtt_kg;

            results.push(SegmentRow {
                city: segment.city.to_string(),
                distance_km: round2(segment.distance_km),
                load_weight_ton: segment.load_weight_ton,
                ttw_kg: emissions.ttw_kg,
                wtt_kg: emissions.wtt_kg,
                wtw_kg: emissions.wtw_kg(),
            });
        }

        tracing::info!(
            "computed {} segments for {vehicle_type}/{fuel_type}: TTW={total_ttw:.2} WTT={total_wtt:.2}",
            results.len()
        );

        Ok(SegmentsResponse {
            vehicle_type: vehicle_type.to_string(),
            fuel_type: fuel_type.to_string(),
            results,
            total_ttw_kg: round2(total_ttw),
            total_wtt_kg: round2(total_wtt),
            total_wtw_kg: round2(total_ttw + total_wtt),
        })
    }

    /// Route mode: provider geometry -> simplification -> segment walk -> city breakdown.
    pub async fn calculate_route(&self, req: &RouteRequest) -> Result<RouteResponse, EngineError> {
        let (start, end, profile) = validate_route_request(req)?;
        let mode = TravelMode::for_vehicle(&profile.vehicle_type);
        tracing::info!(
            "route request {start:?} -> {end:?} as {} ({mode:?})",
            profile.vehicle_type
        );

        let leg = self.router.compute_route(start, end, mode).await?;
        let raw = decode_polyline(&leg.encoded_polyline)?;
        if raw.is_empty() {
            return Err(RoutingError::NoRoute {
                details: "provider returned an empty polyline".to_string(),
            }
            .into());
        }

        let path = simplify_route(
            &raw,
            self.settings.simplify_epsilon,
            self.settings.max_route_points,
        );
        let endpoints = path.get(1..).unwrap_or_default();
        let cities = resolve_cities(
            self.geocoder.as_ref(),
            endpoints,
            self.settings.geocode_concurrency,
        )
        .await;

        let factors = self.factors.lookup(
            &profile.vehicle_type,
            &profile.fuel_type,
            &profile.terrain,
            &profile.road_type,
        );
        let emissions = attribute_route(
            &path,
            &cities,
            factors,
            profile.load_weight_ton,
            self.settings.city_totals,
        );

        let distance_km = leg.distance_meters / 1000.0;
        let duration_hours = duration_hours(
            &profile,
            distance_km,
            leg.duration_seconds,
            self.settings.flight_cruise_kmh,
        );
        let totals = emissions.totals;
        let gpx_base64 = encode_route_as_gpx(
            &path,
            TrackSummary {
                profile: &profile,
                distance_km,
                wtw_kg: totals.wtw_kg(),
            },
        )?;

        tracing::info!(
            "route of {distance_km:.2} km walked over {} waypoints, {} cities",
            path.len(),
            emissions.city_breakdown.len()
        );

        Ok(RouteResponse {
            start,
            end,
            distance_km,
            duration_hours,
            ttw_kg: round2(totals.ttw_kg),
            wtt_kg: round2(totals.wtt_kg),
            wtw_kg: round2(totals.wtw_kg()),
            city_breakdown: emissions.city_breakdown,
            path,
            gpx_base64,
        })
    }
}

/// Checks a route request and turns it into an emission profile.
///
/// Walking needs no fuel, load, road or terrain; every other vehicle needs all four.
pub fn validate_route_request(
    req: &RouteRequest,
) -> Result<(Coordinate, Coordinate, EmissionProfile), EngineError> {
    let (Some(start), Some(end), Some(vehicle_type)) =
        (req.start, req.end, required(req.vehicle_type.as_deref()))
    else {
        return Err(EngineError::invalid("start, end, and vehicle_type are required."));
    };

    let load_weight_ton = match &req.load_weight_ton {
        Some(raw) => Some(
            raw.as_f64()
                .ok_or_else(|| EngineError::invalid("load_weight_ton must be a number"))?,
        ),
        None => None,
    };

    let fuel_type = required(req.fuel_type.as_deref());
    let road_type = required(req.road_type.as_deref());
    let terrain = required(req.terrain.as_deref());

    let profile = if vehicle_type.eq_ignore_ascii_case(WALK) {
        EmissionProfile {
            vehicle_type: vehicle_type.to_string(),
            fuel_type: fuel_type.unwrap_or_default().to_string(),
            terrain: terrain.unwrap_or_default().to_string(),
            road_type: road_type.unwrap_or_default().to_string(),
            load_weight_ton: load_weight_ton.unwrap_or(0.0),
        }
    } else {
        match (fuel_type, load_weight_ton, road_type, terrain) {
            (Some(fuel_type), Some(load), Some(road_type), Some(terrain)) if load != 0.0 => {
                EmissionProfile {
                    vehicle_type: vehicle_type.to_string(),
                    fuel_type: fuel_type.to_string(),
                    terrain: terrain.to_string(),
                    road_type: road_type.to_string(),
                    load_weight_ton: load,
                }
            }
            _ => {
                return Err(EngineError::invalid(
                    "fuel_type, load_weight_ton, road_type, and terrain are required.",
                ))
            }
        }
    };

    Ok((start, end, profile))
}

fn required(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

struct ParsedSegment<'a> {
    city: &'a str,
    distance_km: f64,
    load_weight_ton: f64,
    terrain: &'a str,
    road_type: &'a str,
}

impl<'a> ParsedSegment<'a> {
    fn from_input(input: &'a SegmentInput) -> Result<Self, String> {
        Ok(Self {
            city: input.city.as_deref().ok_or("missing city")?,
            distance_km: number(input.distance.as_ref(), "distance")?,
            load_weight_ton: number(input.load_weight.as_ref(), "load_weight")?,
            terrain: input.terrain.as_deref().ok_or("missing terrain")?,
            road_type: input.road_type.as_deref().ok_or("missing road_type")?,
        })
    }
}

fn number(value: Option<&Numeric>, field: &str) -> Result<f64, String> {
    let value = value.ok_or_else(|| format!("missing {field}"))?;
    value
        .as_f64()
        .ok_or_else(|| format!("{field} is not a number"))
}
