use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::WeatherConfig;
use crate::error::PredictionError;
use crate::models::prediction::{
    ArchiveResponse, DateRange, HourlyBlock, Location, WEATHER_CHANNELS, WeatherFeatureRecord,
};

/// Historical weather reduced to per-channel means (Open-Meteo archive).
pub struct WeatherAggregator {
    client: Client,
    archive_url: String,
}

impl WeatherAggregator {
    pub fn new(cfg: &WeatherConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_s))
            .build()?;

        Ok(Self { client, archive_url: cfg.archive_url.clone() })
    }

    /// Returns `Ok(None)` when the archive has nothing for this location and
    /// period. Transport failures are reported as errors instead.
    pub async fn aggregate(
        &self,
        location: &Location,
        range: &DateRange,
    ) -> Result<Option<WeatherFeatureRecord>, PredictionError> {
        let params = [
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("start_date", range.start_date.format("%Y-%m-%d").to_string()),
            ("end_date", range.end_date.format("%Y-%m-%d").to_string()),
            ("hourly", hourly_variables()),
            ("timezone", "auto".to_string()),
        ];

        debug!(
            lat = location.latitude,
            lon = location.longitude,
            start = %range.start_date,
            end = %range.end_date,
            "requesting hourly weather archive"
        );

        let response = self.client.get(&self.archive_url).query(&params).send().await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(PredictionError::WeatherTransport(format!(
                "archive returned {}",
                status
            )));
        }

        let body = response.text().await?;
        let archive: ArchiveResponse = match serde_json::from_str(&body) {
            Ok(a) => a,
            Err(e) => {
                warn!(%status, error = %e, "undecodable weather archive response");
                return Ok(None);
            }
        };

        if archive.error {
            warn!(
                %status,
                reason = archive.reason.as_deref().unwrap_or("unspecified"),
                "weather archive rejected the request"
            );
            return Ok(None);
        }

        let Some(hourly) = archive.hourly else {
            info!(
                lat = location.latitude,
                lon = location.longitude,
                "weather data not available for this location/date"
            );
            return Ok(None);
        };

        debug!(
            hours = hourly.time.len(),
            timezone = archive.timezone.as_deref().unwrap_or("?"),
            "hourly weather received"
        );
        aggregate_hourly(&hourly)
    }
}

/// Comma-joined archive variable names, in schema order.
pub fn hourly_variables() -> String {
    WEATHER_CHANNELS
        .iter()
        .map(|c| c.source)
        .collect::<Vec<_>>()
        .join(",")
}

/// Reduces each requested channel to its arithmetic mean.
///
/// Null samples are skipped, so a channel with gaps is averaged over what is
/// there. A zero-length time axis means no data; a channel that is absent or
/// entirely null makes the whole record invalid.
pub fn aggregate_hourly(hourly: &HourlyBlock) -> Result<Option<WeatherFeatureRecord>, PredictionError> {
    if hourly.time.is_empty() {
        return Ok(None);
    }

    let mut means = [0.0; 13];
    for (slot, channel) in means.iter_mut().zip(WEATHER_CHANNELS.iter()) {
        let samples = hourly.channels.get(channel.source).ok_or_else(|| {
            PredictionError::IncompleteWeather(format!("channel {} missing", channel.source))
        })?;

        *slot = channel_mean(samples).ok_or_else(|| {
            PredictionError::IncompleteWeather(format!("channel {} has no samples", channel.source))
        })?;
    }

    Ok(Some(WeatherFeatureRecord::from_means(means)))
}

fn channel_mean(samples: &[Option<f64>]) -> Option<f64> {
    let (sum, n) = samples
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));

    if n == 0 { None } else { Some(sum / n as f64) }
}
