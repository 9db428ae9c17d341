use utoipa::OpenApi;
use crate::controllers::prediction_controller;
use crate::models::prediction;

#[derive(OpenApi)]
#[openapi(
    paths(
        prediction_controller::predict,
        prediction_controller::get_feature_schema,
        prediction_controller::list_azimuths,
        prediction_controller::health
    ),
    components(
        schemas(
            prediction::PredictRequest,
            prediction::PredictResponse,
            prediction::Prediction,
            prediction::DateRange,
            prediction::WeatherFeatureRecord,
            prediction::SolarFeatureRecord,
            prediction::FeatureSchema,
            prediction::AzimuthOption,
            prediction::CompassDirection,
            prediction::HealthStatus
        )
    ),
    tags(
        (name = "solar-power-predictor", description = "Solar Power Prediction API")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for p in ["/api/predict", "/api/features/schema", "/api/panel/azimuths", "/api/health"] {
            assert!(doc.paths.paths.contains_key(p), "missing {}", p);
        }
    }
}
