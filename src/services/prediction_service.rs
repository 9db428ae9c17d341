use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::error::PredictionError;
use crate::models::prediction::{
    CompassDirection, DateRange, Location, PanelConfig, PredictRequest, PredictResponse,
};
use crate::services::{feature_assembler, solar_algorithm};
use crate::shared_state::AppState;

/// Validated inputs of one prediction.
struct Inputs {
    location: Location,
    panel: PanelConfig,
    tz: Tz,
}

fn validate(req: &PredictRequest, default_timezone: Tz) -> Result<Inputs, PredictionError> {
    let timezone = req
        .timezone
        .as_deref()
        .map(|name| {
            name.parse::<Tz>()
                .map_err(|_| PredictionError::InvalidInput(format!("unknown timezone {}", name)))
        })
        .transpose()?;

    let location = Location::new(req.latitude, req.longitude, timezone)?;

    let direction = CompassDirection::from_degrees(req.azimuth_degrees).ok_or_else(|| {
        PredictionError::InvalidInput(format!(
            "azimuth {} is not one of 0, 45, 90, 135, 180, 225, 270, 315",
            req.azimuth_degrees
        ))
    })?;
    let panel = PanelConfig::new(req.tilt_degrees as f64, direction.degrees() as f64)?;

    Ok(Inputs { location, panel, tz: location.timezone_or(default_timezone) })
}

/// Weather, then solar geometry, then scale and predict, all anchored at `now`.
/// Stops before inference when the archive has no data.
pub async fn run_prediction_at(
    state: &AppState,
    req: PredictRequest,
    now: DateTime<Utc>,
) -> Result<PredictResponse, PredictionError> {
    let Inputs { location, panel, tz } = validate(&req, state.default_timezone)?;
    let date_range = DateRange::default_for(now, tz);

    info!(
        lat = location.latitude,
        lon = location.longitude,
        tilt = panel.tilt_degrees,
        azimuth = panel.azimuth_degrees,
        start = %date_range.start_date,
        end = %date_range.end_date,
        "fetching weather data"
    );

    let Some(weather) = state.weather.aggregate(&location, &date_range).await? else {
        warn!(lat = location.latitude, lon = location.longitude, "weather data could not be retrieved");
        return Err(PredictionError::WeatherUnavailable);
    };

    let solar = solar_algorithm::estimate(&location, tz, &panel, now);
    let features = feature_assembler::assemble(Some(weather), &solar)?;
    let prediction = state.pipeline.predict(&features)?;

    info!(kilowatts = prediction.kilowatts, "prediction complete");

    Ok(PredictResponse {
        display: prediction.display(),
        prediction,
        date_range,
        weather,
        solar,
        computed_at: now,
    })
}

pub async fn run_prediction(state: &AppState, req: PredictRequest) -> Result<PredictResponse, PredictionError> {
    run_prediction_at(state, req, Utc::now()).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::WeatherConfig;
    use crate::models::prediction::{FeatureVector, WEATHER_CHANNELS, feature_names};
    use crate::services::inference::{FeatureTransform, InferencePipeline, Regressor};
    use crate::services::weather_service::WeatherAggregator;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Passes features through and counts how often inference ran.
    pub(crate) struct CountingStub {
        pub names: Vec<String>,
        pub calls: Arc<AtomicUsize>,
    }

    impl FeatureTransform for CountingStub {
        fn feature_names(&self) -> &[String] { &self.names }
        fn transform(&self, f: &FeatureVector) -> Result<FeatureVector, PredictionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(f.clone())
        }
    }

    impl Regressor for CountingStub {
        fn feature_names(&self) -> &[String] { &self.names }
        fn predict(&self, f: &FeatureVector) -> Result<f64, PredictionError> {
            Ok(f.values.iter().sum::<f64>() / f.len() as f64)
        }
    }

    pub(crate) fn stub_state(archive_url: String, calls: Arc<AtomicUsize>) -> AppState {
        let names: Vec<String> = feature_names().into_iter().map(String::from).collect();
        let pipeline = InferencePipeline::new(
            Box::new(CountingStub { names: names.clone(), calls: calls.clone() }),
            Box::new(CountingStub { names, calls }),
            None,
        )
        .unwrap();
        let weather = WeatherAggregator::new(&WeatherConfig { archive_url, timeout_s: 5 }).unwrap();
        AppState::new(weather, pipeline, chrono_tz::Asia::Kolkata)
    }

    pub(crate) fn archive_body() -> serde_json::Value {
        let mut hourly = serde_json::Map::new();
        hourly.insert("time".into(), json!(["2025-06-08T00:00", "2025-06-08T01:00"]));
        for (i, c) in WEATHER_CHANNELS.iter().enumerate() {
            hourly.insert(c.source.into(), json!([i as f64, i as f64 + 2.0]));
        }
        json!({ "timezone": "Asia/Kolkata", "hourly": hourly })
    }

    fn request(lat: f64, lon: f64, tilt: u8, azimuth: u16) -> PredictRequest {
        PredictRequest { latitude: lat, longitude: lon, tilt_degrees: tilt, azimuth_degrees: azimuth, timezone: None }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 6, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn central_india_produces_a_finite_prediction() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("start_date", "2025-06-08"))
            .and(query_param("end_date", "2025-06-09"))
            .respond_with(ResponseTemplate::new(200).set_body_json(archive_body()))
            .expect(1)
            .mount(&server)
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let state = stub_state(server.uri(), calls.clone());
        let resp = run_prediction_at(&state, request(20.0, 78.0, 30, 180), now()).await.unwrap();

        assert!(resp.prediction.kilowatts.is_finite());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(resp.weather.temperature_2_m_above_gnd, 1.0);
        assert_eq!(resp.weather.wind_gust_10_m_above_gnd, 13.0);
        assert!(resp.display.ends_with(" kW"));
    }

    #[tokio::test]
    async fn mid_ocean_halts_before_inference() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "timezone": "GMT" })))
            .mount(&server)
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let state = stub_state(server.uri(), calls.clone());
        let err = run_prediction_at(&state, request(0.0, -140.0, 30, 180), now()).await.unwrap_err();

        assert!(matches!(err, PredictionError::WeatherUnavailable));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn flat_panel_incidence_tracks_zenith() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(archive_body()))
            .mount(&server)
            .await;

        let state = stub_state(server.uri(), Arc::new(AtomicUsize::new(0)));
        for azimuth in [0, 90, 225] {
            let resp = run_prediction_at(&state, request(45.0, 9.0, 0, azimuth), now()).await.unwrap();
            assert!((resp.solar.angle_of_incidence - resp.solar.zenith).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn invalid_inputs_never_reach_the_archive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(archive_body()))
            .expect(0)
            .mount(&server)
            .await;

        let state = stub_state(server.uri(), Arc::new(AtomicUsize::new(0)));
        for req in [
            request(95.0, 0.0, 30, 180),
            request(10.0, 0.0, 91, 180),
            request(10.0, 0.0, 30, 100),
            PredictRequest { timezone: Some("Nowhere/Land".into()), ..request(10.0, 0.0, 30, 180) },
        ] {
            let err = run_prediction_at(&state, req, now()).await.unwrap_err();
            assert!(matches!(err, PredictionError::InvalidInput(_)), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn explicit_timezone_moves_the_date_range() {
        let server = MockServer::start().await;
        // 06:00 UTC on June 10 is still June 9 in Los Angeles
        Mock::given(method("GET"))
            .and(query_param("start_date", "2025-06-07"))
            .and(query_param("end_date", "2025-06-08"))
            .respond_with(ResponseTemplate::new(200).set_body_json(archive_body()))
            .expect(1)
            .mount(&server)
            .await;

        let state = stub_state(server.uri(), Arc::new(AtomicUsize::new(0)));
        let req = PredictRequest {
            timezone: Some("America/Los_Angeles".into()),
            ..request(34.0, -118.0, 20, 180)
        };
        let resp = run_prediction_at(&state, req, now()).await.unwrap();
        assert_eq!(resp.date_range.end_date.to_string(), "2025-06-08");
    }
}
