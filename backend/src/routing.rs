use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::http::retry_once;
use crate::models::{Coordinate, TravelMode};

pub const GOOGLE_ROUTES_URL: &str = "https://routes.googleapis.com/directions/v2:computeRoutes";
const FIELD_MASK: &str = "routes.duration,routes.distanceMeters,routes.polyline.encodedPolyline";
const POLYLINE_PRECISION: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("routing provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("no route found")]
    NoRoute { details: String },
    #[error("invalid encoded polyline: {0}")]
    InvalidPolyline(String),
    #[error("invalid route duration: {0}")]
    InvalidDuration(String),
}

/// The single route leg returned by a provider, before any simplification.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLeg {
    pub encoded_polyline: String,
    pub distance_meters: f64,
    pub duration_seconds: i64,
}

/// Turns two coordinates into a raw route.
///
/// Implementations must return [`RoutingError::NoRoute`] when the provider
/// answers but has no usable route.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn compute_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<RouteLeg, RoutingError>;
}

/// Decodes a Google encoded polyline (precision 5) into travel-ordered coordinates.
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>, RoutingError> {
    let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION)
        .map_err(|err| RoutingError::InvalidPolyline(err.to_string()))?;
    Ok(line
        .0
        .into_iter()
        .map(|c| Coordinate { lat: c.y, lon: c.x })
        .collect())
}

/// Parses a protobuf duration such as `"1234s"`, truncating to whole seconds.
pub fn parse_duration_seconds(raw: &str) -> Result<i64, RoutingError> {
    let seconds: f64 = raw
        .trim()
        .trim_end_matches('s')
        .parse()
        .map_err(|_| RoutingError::InvalidDuration(raw.to_string()))?;
    if !seconds.is_finite() {
        return Err(RoutingError::InvalidDuration(raw.to_string()));
    }
    Ok(seconds.trunc() as i64)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeRoutesRequest {
    origin: Waypoint,
    destination: Waypoint,
    travel_mode: TravelMode,
}

#[derive(Debug, Serialize)]
struct Waypoint {
    location: Location,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    lat_lng: LatLng,
}

#[derive(Debug, Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

impl From<Coordinate> for Waypoint {
    fn from(coord: Coordinate) -> Self {
        Waypoint {
            location: Location {
                lat_lng: LatLng {
                    latitude: coord.lat,
                    longitude: coord.lon,
                },
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ComputeRoutesResponse {
    #[serde(default)]
    routes: Vec<GoogleRoute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleRoute {
    #[serde(default)]
    distance_meters: f64,
    duration: Option<String>,
    polyline: Option<GooglePolyline>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GooglePolyline {
    encoded_polyline: String,
}

/// Extracts the first route from a Routes API payload.
pub fn leg_from_response(payload: serde_json::Value) -> Result<RouteLeg, RoutingError> {
    let no_route = || RoutingError::NoRoute {
        details: payload.to_string(),
    };
    let parsed: ComputeRoutesResponse =
        serde_json::from_value(payload.clone()).unwrap_or_default();
    let route = parsed.routes.into_iter().next().ok_or_else(no_route)?;
    let encoded_polyline = route
        .polyline
        .map(|p| p.encoded_polyline)
        .filter(|p| !p.is_empty())
        .ok_or_else(no_route)?;
    let duration_seconds = match route.duration.as_deref() {
        Some(raw) => parse_duration_seconds(raw)?,
        None => 0,
    };

    Ok(RouteLeg {
        encoded_polyline,
        distance_meters: route.distance_meters,
        duration_seconds,
    })
}

/// Google Routes API v2 client.
#[derive(Clone)]
pub struct GoogleRoutesClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl GoogleRoutesClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    async fn post(&self, body: &ComputeRoutesRequest) -> Result<serde_json::Value, reqwest::Error> {
        self.http
            .post(&self.url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(body)
            .send()
            .await?
            .json()
            .await
    }
}

#[async_trait]
impl RoutingProvider for GoogleRoutesClient {
    async fn compute_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<RouteLeg, RoutingError> {
        let body = ComputeRoutesRequest {
            origin: origin.into(),
            destination: destination.into(),
            travel_mode: mode,
        };
        tracing::debug!("requesting {mode:?} route {origin:?} -> {destination:?}");
        let payload = retry_once("routes request", || self.post(&body)).await?;
        leg_from_response(payload)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_reference_polyline() {
        let coords = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        let expected = [(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)];
        assert_eq!(coords.len(), expected.len());
        for (got, (lat, lon)) in coords.iter().zip(expected) {
            assert!((got.lat - lat).abs() < 1e-6);
            assert!((got.lon - lon).abs() < 1e-6);
        }
    }

    #[test]
    fn empty_polyline_decodes_to_nothing() {
        assert!(decode_polyline("").unwrap().is_empty());
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration_seconds("1234s").unwrap(), 1234);
        assert_eq!(parse_duration_seconds("59.9s").unwrap(), 59);
        assert!(matches!(
            parse_duration_seconds("soon"),
            Err(RoutingError::InvalidDuration(_))
        ));
    }

    #[test]
    fn extracts_first_route() {
        let payload = json!({
            "routes": [{
                "distanceMeters": 12500,
                "duration": "900s",
                "polyline": {"encodedPolyline": "_p~iF~ps|U_ulLnnqC"}
            }]
        });
        let leg = leg_from_response(payload).unwrap();
        assert_eq!(leg.distance_meters, 12500.0);
        assert_eq!(leg.duration_seconds, 900);
        assert_eq!(leg.encoded_polyline, "_p~iF~ps|U_ulLnnqC");
    }

    #[test]
    fn missing_routes_is_no_route_with_details() {
        let payload = json!({"error": {"code": 403, "message": "API key not valid"}});
        match leg_from_response(payload) {
            Err(RoutingError::NoRoute { details }) => assert!(details.contains("API key not valid")),
            other => panic!("expected NoRoute, got {other:?}"),
        }
    }

    #[test]
    fn empty_routes_is_no_route() {
        assert!(matches!(
            leg_from_response(json!({"routes": []})),
            Err(RoutingError::NoRoute { .. })
        ));
        assert!(matches!(
            leg_from_response(json!({})),
            Err(RoutingError::NoRoute { .. })
        ));
    }

    #[test]
    fn request_body_matches_routes_api() {
        let body = ComputeRoutesRequest {
            origin: Coordinate::new(45.0, 5.0).into(),
            destination: Coordinate::new(45.5, 5.5).into(),
            travel_mode: TravelMode::Drive,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["origin"]["location"]["latLng"]["latitude"], 45.0);
        assert_eq!(value["destination"]["location"]["latLng"]["longitude"], 5.5);
        assert_eq!(value["travelMode"], "DRIVE");
    }

    #[tokio::test]
    async fn unreachable_provider_is_transport_error() {
        let http = crate::http::build_client(std::time::Duration::from_secs(2), "").unwrap();
        let client = GoogleRoutesClient::new(http, "http://127.0.0.1:9/routes", "key");
        let result = client
            .compute_route(
                Coordinate::new(45.0, 5.0),
                Coordinate::new(45.1, 5.1),
                TravelMode::Drive,
            )
            .await;
        assert!(matches!(result, Err(RoutingError::Transport(_))));
    }
}
