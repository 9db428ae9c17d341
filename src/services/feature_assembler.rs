use crate::error::PredictionError;
use crate::models::prediction::{
    FeatureVector, SolarFeatureRecord, WEATHER_CHANNELS, WeatherFeatureRecord, feature_names,
};

/// Joins weather and solar features into the fixed 16-column model input.
///
/// There is no default for missing weather: `None` stops the pipeline.
pub fn assemble(
    weather: Option<WeatherFeatureRecord>,
    solar: &SolarFeatureRecord,
) -> Result<FeatureVector, PredictionError> {
    let weather = weather.ok_or(PredictionError::WeatherUnavailable)?;

    let values: Vec<f64> = weather
        .values()
        .into_iter()
        .chain(solar.values())
        .collect();

    let names: Vec<String> = feature_names().into_iter().map(String::from).collect();

    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        let reason = format!("feature {} is not a finite number", names[i]);
        return Err(if i < WEATHER_CHANNELS.len() {
            PredictionError::IncompleteWeather(reason)
        } else {
            PredictionError::SolarGeometry(reason)
        });
    }

    Ok(FeatureVector { names, values })
}
