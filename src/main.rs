mod api_docs;
mod config;
mod controllers;
mod error;
mod models;
mod routes;
mod services;
mod shared_state;

use axum::{Router, response::Html, routing::get};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_scalar::Scalar;

use crate::api_docs::ApiDoc;
use crate::config::Config;
use crate::models::prediction::feature_names;
use crate::routes::prediction_routes::api_routes;
use crate::services::inference::{InferencePipeline, load_regressor, load_scaler};
use crate::services::weather_service::WeatherAggregator;
use crate::shared_state::AppState;

fn init_tracing() {
    let default_filter = if cfg!(feature = "verbose_log") {
        "debug,hyper=warn,reqwest=warn"
    } else {
        "info,hyper=warn,reqwest=warn,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

/// Loads both artifacts and checks them against the feature schema.
/// Any failure here leaves nothing to serve.
fn build_pipeline(config: &Config) -> Result<InferencePipeline, Box<dyn std::error::Error>> {
    let scaler = load_scaler(&config.artifacts.scaler_path)?;
    let model = load_regressor(&config.artifacts.model_path)?;
    let expected = feature_names();
    Ok(InferencePipeline::new(Box::new(scaler), Box::new(model), Some(expected.as_slice()))?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // 1. Load configuration
    let config_path = std::env::var("PREDICTOR_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "failed to load configuration");
        e
    })?;
    info!(path = %config_path, timezone = %config.default_timezone, "configuration loaded");

    // 2. Load model artifacts once, shared by every request
    let pipeline = build_pipeline(&config).map_err(|e| {
        error!(error = %e, "failed to load model artifacts");
        e
    })?;

    // 3. Weather archive client
    let weather = WeatherAggregator::new(&config.weather)?;

    let state = AppState::new(weather, pipeline, config.default_timezone);

    // 4. Start Axum HTTP server
    let app = Router::new()
        .nest("/api", api_routes(state))
        .route("/scalar", get(|| async {
            Html(Scalar::new(ApiDoc::openapi()).to_html())
        }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("API Server listening on http://{}", addr);
    info!("Scalar UI: http://{}/scalar", addr);

    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
