use std::sync::Arc;

use chrono_tz::Tz;

use crate::services::inference::InferencePipeline;
use crate::services::weather_service::WeatherAggregator;

/// Everything a request handler needs. Built once in `main`; all members are
/// read-only, so clones share the same loaded artifacts.
#[derive(Clone)]
pub struct AppState {
    pub weather: Arc<WeatherAggregator>,
    pub pipeline: Arc<InferencePipeline>,
    pub default_timezone: Tz,
}

impl AppState {
    pub fn new(weather: WeatherAggregator, pipeline: InferencePipeline, default_timezone: Tz) -> Self {
        Self {
            weather: Arc::new(weather),
            pipeline: Arc::new(pipeline),
            default_timezone,
        }
    }
}
