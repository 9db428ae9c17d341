use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::error::PredictionError;
use crate::models::prediction::{
    AzimuthOption, CompassDirection, FeatureSchema, HealthStatus, PredictRequest, PredictResponse,
    WEATHER_CHANNELS, feature_names,
};
use crate::services::prediction_service;
use crate::shared_state::AppState;

/// POST /api/predict
/// Predict solar power output for a location and panel setup
///
/// Averages the last two settled days of hourly weather at the location,
/// combines them with the solar geometry of the next 24 hours, and runs the
/// fitted scaler and model over the result.
#[utoipa::path(
    post,
    path = "/api/predict",
    request_body = PredictRequest,
    responses(
        (status = 200, description = "Predicted output", body = PredictResponse),
        (status = 400, description = "Malformed body, invalid location or panel settings"),
        (status = 422, description = "Weather data not available for this location/date"),
        (status = 502, description = "Weather source unreachable or incomplete"),
        (status = 500, description = "Feature schema does not match the loaded artifacts")
    )
)]
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, PredictionError> {
    let Json(req) = payload?;
    prediction_service::run_prediction(&state, req).await.map(Json)
}

/// GET /api/features/schema
/// Ordered model input columns
#[utoipa::path(
    get,
    path = "/api/features/schema",
    responses(
        (status = 200, description = "Feature names in model order", body = FeatureSchema)
    )
)]
pub async fn get_feature_schema() -> Json<FeatureSchema> {
    Json(FeatureSchema {
        feature_names: feature_names().into_iter().map(String::from).collect(),
        weather_sources: WEATHER_CHANNELS.iter().map(|c| c.source.to_string()).collect(),
    })
}

/// GET /api/panel/azimuths
/// Panel facing directions accepted by /api/predict
#[utoipa::path(
    get,
    path = "/api/panel/azimuths",
    responses(
        (status = 200, description = "The eight compass options", body = Vec<AzimuthOption>)
    )
)]
pub async fn list_azimuths() -> Json<Vec<AzimuthOption>> {
    Json(
        CompassDirection::ALL
            .into_iter()
            .map(|d| AzimuthOption { direction: d, label: d.label().to_string(), degrees: d.degrees() })
            .collect(),
    )
}

/// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up with artifacts loaded", body = HealthStatus)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        feature_count: state.pipeline.feature_names().len(),
    })
}
