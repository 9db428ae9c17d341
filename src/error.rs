use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Failures of a single prediction request. None of these take the process down.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    /// The archive answered but holds nothing for this location and period.
    #[error("Weather data not available for this location/date")]
    WeatherUnavailable,

    #[error("Weather source unreachable: {0}")]
    WeatherTransport(String),

    #[error("Weather response incomplete: {0}")]
    IncompleteWeather(String),

    #[error("Solar geometry produced an invalid feature: {0}")]
    SolarGeometry(String),

    /// The assembled vector does not fit the loaded artifacts.
    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl From<reqwest::Error> for PredictionError {
    fn from(e: reqwest::Error) -> Self {
        PredictionError::WeatherTransport(e.to_string())
    }
}

impl From<JsonRejection> for PredictionError {
    fn from(rejection: JsonRejection) -> Self {
        PredictionError::InvalidInput(rejection.body_text())
    }
}

/// Startup failures loading the scaler or the model.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("cannot read artifact {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse artifact {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid artifact: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl PredictionError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PredictionError::WeatherUnavailable => StatusCode::UNPROCESSABLE_ENTITY,
            PredictionError::WeatherTransport(_) | PredictionError::IncompleteWeather(_) => {
                StatusCode::BAD_GATEWAY
            }
            PredictionError::SolarGeometry(_) | PredictionError::SchemaMismatch(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            PredictionError::InvalidInput(_) => "InvalidInput",
            PredictionError::WeatherUnavailable => "WeatherUnavailable",
            PredictionError::WeatherTransport(_) => "WeatherTransport",
            PredictionError::IncompleteWeather(_) => "IncompleteWeather",
            PredictionError::SolarGeometry(_) => "SolarGeometry",
            PredictionError::SchemaMismatch(_) => "SchemaMismatch",
        }
    }
}

impl IntoResponse for PredictionError {
    fn into_response(self) -> Response {
        match &self {
            PredictionError::SchemaMismatch(_) => {
                tracing::error!(error = %self, "artifacts do not match the feature pipeline")
            }
            PredictionError::SolarGeometry(_) => {
                tracing::error!(error = %self, "solar geometry failure")
            }
            PredictionError::WeatherTransport(_) | PredictionError::IncompleteWeather(_) => {
                tracing::warn!(error = %self, "weather source failure")
            }
            _ => tracing::debug!(error = %self, "prediction refused"),
        }

        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
