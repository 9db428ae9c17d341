use axum::{
    Router,
    routing::{get, post},
};
use crate::controllers::prediction_controller::{
    get_feature_schema, health, list_azimuths, predict,
};
use crate::shared_state::AppState;

/// Build the `/api/*` sub-router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/predict",          post(predict))
        .route("/features/schema",  get(get_feature_schema))
        .route("/panel/azimuths",   get(list_azimuths))
        .route("/health",           get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::prediction_service::tests::{archive_body, stub_state};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_predict(body: Value) -> Request<Body> {
        Request::post("/predict")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn predict_returns_kilowatts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(archive_body()))
            .mount(&server)
            .await;

        let app = api_routes(stub_state(server.uri(), Arc::new(AtomicUsize::new(0))));
        let resp = app
            .oneshot(post_predict(json!({"latitude": 20.0, "longitude": 78.0, "tilt_degrees": 30, "azimuth_degrees": 180})))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert!(body["prediction"]["kilowatts"].as_f64().unwrap().is_finite());
        assert!(body["weather"]["mean_sea_level_pressure_MSL"].is_number());
        assert!(body["solar"]["angle_of_incidence"].is_number());
    }

    #[tokio::test]
    async fn predict_defaults_panel_to_30_degrees_south() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(archive_body()))
            .mount(&server)
            .await;

        let app = api_routes(stub_state(server.uri(), Arc::new(AtomicUsize::new(0))));
        let resp = app
            .oneshot(post_predict(json!({"latitude": 20.0, "longitude": 78.0})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_weather_is_unprocessable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"timezone": "GMT"})))
            .mount(&server)
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let app = api_routes(stub_state(server.uri(), calls.clone()));
        let resp = app
            .oneshot(post_predict(json!({"latitude": 0.0, "longitude": -140.0})))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(resp).await["error"], "WeatherUnavailable");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bad_azimuth_is_bad_request() {
        let app = api_routes(stub_state("http://127.0.0.1:9".into(), Arc::new(AtomicUsize::new(0))));
        let resp = app
            .oneshot(post_predict(json!({"latitude": 0.0, "longitude": 0.0, "azimuth_degrees": 10})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn undecodable_body_is_bad_request_with_envelope() {
        for body in [
            json!({"latitude": 20.0, "longitude": 78.0, "tilt_degrees": 300}),
            json!({"latitude": 20.0, "longitude": 78.0, "tilt_degrees": 30.5}),
            json!({"longitude": 78.0}),
        ] {
            let app = api_routes(stub_state("http://127.0.0.1:9".into(), Arc::new(AtomicUsize::new(0))));
            let resp = app.oneshot(post_predict(body.clone())).await.unwrap();

            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", body);
            let err = body_json(resp).await;
            assert_eq!(err["error"], "InvalidInput");
            assert!(err["message"].is_string());
        }
    }

    #[tokio::test]
    async fn missing_latitude_is_named_in_the_message() {
        let app = api_routes(stub_state("http://127.0.0.1:9".into(), Arc::new(AtomicUsize::new(0))));
        let resp = app
            .oneshot(post_predict(json!({"longitude": 78.0})))
            .await
            .unwrap();
        let err = body_json(resp).await;
        assert!(err["message"].as_str().unwrap().contains("latitude"));
    }

    #[tokio::test]
    async fn schema_lists_sixteen_columns() {
        let app = api_routes(stub_state("http://127.0.0.1:9".into(), Arc::new(AtomicUsize::new(0))));
        let resp = app
            .oneshot(Request::get("/features/schema").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(resp).await;
        assert_eq!(body["feature_names"].as_array().unwrap().len(), 16);
        assert_eq!(body["weather_sources"].as_array().unwrap().len(), 13);
    }

    #[tokio::test]
    async fn azimuths_are_the_eight_compass_points() {
        let app = api_routes(stub_state("http://127.0.0.1:9".into(), Arc::new(AtomicUsize::new(0))));
        let resp = app
            .oneshot(Request::get("/panel/azimuths").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(resp).await;
        let degrees: Vec<u64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["degrees"].as_u64().unwrap())
            .collect();
        assert_eq!(degrees, vec![0, 45, 90, 135, 180, 225, 270, 315]);
        assert_eq!(body[4]["label"], "South (180°)");
    }

    #[tokio::test]
    async fn health_reports_feature_count() {
        let app = api_routes(stub_state("http://127.0.0.1:9".into(), Arc::new(AtomicUsize::new(0))));
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["feature_count"], 16);
    }
}
