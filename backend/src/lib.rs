pub mod accumulator;
pub mod attribution;
pub mod comparison;
pub mod config;
pub mod emission_factors;
pub mod engine;
pub mod error;
pub mod geocoding;
pub mod gpx_export;
pub mod http;
pub mod models;
pub mod routing;
pub mod simplify;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::comparison::{compare_fuels, ComparisonError};
use crate::engine::EmissionEngine;
use crate::error::EngineError;
use crate::models::{
    ApiError, CompareRequest, CompareResponse, RouteRequest, RouteResponse, SegmentsRequest,
    SegmentsResponse,
};
use crate::routing::RoutingError;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EmissionEngine>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/emissions", post(emissions_handler))
        .route("/api/route", post(route_handler))
        .route("/api/compare", post(compare_handler))
        .layer(cors)
        .with_state(state)
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

async fn emissions_handler(
    State(state): State<AppState>,
    payload: Result<Json<SegmentsRequest>, JsonRejection>,
) -> ApiResult<SegmentsResponse> {
    let Json(req) = payload.map_err(json_rejection_to_api_error)?;
    state
        .engine
        .calculate_segments(&req)
        .map(Json)
        .map_err(engine_error_to_api_error)
}

async fn route_handler(
    State(state): State<AppState>,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> ApiResult<RouteResponse> {
    let Json(req) = payload.map_err(json_rejection_to_api_error)?;
    state
        .engine
        .calculate_route(&req)
        .await
        .map(Json)
        .map_err(engine_error_to_api_error)
}

async fn compare_handler(
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> ApiResult<CompareResponse> {
    let Json(req) = payload.map_err(json_rejection_to_api_error)?;
    let baseline_fuel = req.baseline_fuel.as_deref().unwrap_or_default();
    let Some(baseline_emission) = req.baseline_emission.as_ref().and_then(|v| v.as_f64()) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Invalid input",
            Some("baseline_emission must be a number".to_string()),
        ));
    };

    compare_fuels(baseline_fuel, baseline_emission)
        .map(Json)
        .map_err(|err: ComparisonError| {
            api_error(StatusCode::BAD_REQUEST, "Invalid input", Some(err.to_string()))
        })
}

/// Body that is not JSON, or JSON of the wrong shape, is an input error like any other.
fn json_rejection_to_api_error(rejection: JsonRejection) -> (StatusCode, Json<ApiError>) {
    tracing::debug!("rejected request body: {rejection}");
    api_error(
        StatusCode::BAD_REQUEST,
        "Invalid JSON",
        Some(rejection.body_text()),
    )
}

fn engine_error_to_api_error(err: EngineError) -> (StatusCode, Json<ApiError>) {
    match err {
        EngineError::InvalidInput(message) => api_error(StatusCode::BAD_REQUEST, message, None),
        EngineError::Routing(RoutingError::NoRoute { details }) => {
            tracing::warn!("no route found: {details}");
            api_error(StatusCode::NOT_FOUND, "No route found", Some(details))
        }
        EngineError::Routing(err) => {
            tracing::error!("routing provider failure: {err}");
            api_error(StatusCode::BAD_GATEWAY, err.to_string(), None)
        }
        EngineError::Gpx(err) => {
            tracing::error!("gpx export failed: {err}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), None)
        }
    }
}

fn api_error(
    status: StatusCode,
    message: impl Into<String>,
    details: Option<String>,
) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            message: message.into(),
            details,
        }),
    )
}
