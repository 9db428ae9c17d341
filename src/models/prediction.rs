use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::PredictionError;

// ─── Feature schema ──────────────────────────────────────────────────────────
//
// The order of these tables is the column order the scaler and the model were
// fitted on. Changing it requires new artifacts.

/// One hourly archive variable and the model feature it is averaged into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherChannel {
    pub source: &'static str,
    pub feature: &'static str,
}

pub const WEATHER_CHANNELS: [WeatherChannel; 13] = [
    WeatherChannel { source: "temperature_2m",       feature: "temperature_2_m_above_gnd" },
    WeatherChannel { source: "relative_humidity_2m", feature: "relative_humidity_2_m_above_gnd" },
    WeatherChannel { source: "pressure_msl",         feature: "mean_sea_level_pressure_MSL" },
    WeatherChannel { source: "precipitation",        feature: "total_precipitation_sfc" },
    WeatherChannel { source: "snowfall",             feature: "snowfall_amount_sfc" },
    WeatherChannel { source: "cloud_cover",          feature: "total_cloud_cover_sfc" },
    WeatherChannel { source: "cloud_cover_high",     feature: "high_cloud_cover_high_cld_lay" },
    WeatherChannel { source: "cloud_cover_mid",      feature: "medium_cloud_cover_mid_cld_lay" },
    WeatherChannel { source: "cloud_cover_low",      feature: "low_cloud_cover_low_cld_lay" },
    WeatherChannel { source: "shortwave_radiation",  feature: "shortwave_radiation_backwards_sfc" },
    WeatherChannel { source: "wind_speed_10m",       feature: "wind_speed_10_m_above_gnd" },
    WeatherChannel { source: "wind_direction_10m",   feature: "wind_direction_10_m_above_gnd" },
    WeatherChannel { source: "wind_gusts_10m",       feature: "wind_gust_10_m_above_gnd" },
];

pub const SOLAR_FEATURE_NAMES: [&str; 3] = ["angle_of_incidence", "zenith", "azimuth"];

pub const FEATURE_COUNT: usize = WEATHER_CHANNELS.len() + SOLAR_FEATURE_NAMES.len();

/// Full model input schema: 13 weather means followed by 3 solar means.
pub fn feature_names() -> Vec<&'static str> {
    WEATHER_CHANNELS
        .iter()
        .map(|c| c.feature)
        .chain(SOLAR_FEATURE_NAMES)
        .collect()
}

// ─── Request inputs ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Falls back to the configured default zone when not given.
    pub timezone: Option<Tz>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, timezone: Option<Tz>) -> Result<Self, PredictionError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(PredictionError::InvalidInput(format!(
                "latitude {} outside [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(PredictionError::InvalidInput(format!(
                "longitude {} outside [-180, 180]",
                longitude
            )));
        }
        Ok(Self { latitude, longitude, timezone })
    }

    pub fn timezone_or(&self, default: Tz) -> Tz {
        self.timezone.unwrap_or(default)
    }
}

/// Inclusive calendar range for the weather archive query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, PredictionError> {
        if start_date > end_date {
            return Err(PredictionError::InvalidInput(format!(
                "start date {} is after end date {}",
                start_date, end_date
            )));
        }
        Ok(Self { start_date, end_date })
    }

    /// Two days ago through yesterday, as seen on the calendar of `tz`.
    /// The archive only holds settled data for days that are fully over.
    pub fn default_for(now: DateTime<Utc>, tz: Tz) -> Self {
        let today = tz.from_utc_datetime(&now.naive_utc()).date_naive();
        let end_date = today - Days::new(1);
        let start_date = today - Days::new(2);
        Self { start_date, end_date }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelConfig {
    pub tilt_degrees: f64,
    pub azimuth_degrees: f64,
}

impl PanelConfig {
    pub fn new(tilt_degrees: f64, azimuth_degrees: f64) -> Result<Self, PredictionError> {
        if !tilt_degrees.is_finite() || !(0.0..=90.0).contains(&tilt_degrees) {
            return Err(PredictionError::InvalidInput(format!(
                "panel tilt {} outside [0, 90]",
                tilt_degrees
            )));
        }
        if !azimuth_degrees.is_finite() || !(0.0..360.0).contains(&azimuth_degrees) {
            return Err(PredictionError::InvalidInput(format!(
                "panel azimuth {} outside [0, 360)",
                azimuth_degrees
            )));
        }
        Ok(Self { tilt_degrees, azimuth_degrees })
    }
}

/// The eight facing directions offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompassDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    #[default]
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassDirection {
    pub const ALL: [CompassDirection; 8] = [
        CompassDirection::North,
        CompassDirection::NorthEast,
        CompassDirection::East,
        CompassDirection::SouthEast,
        CompassDirection::South,
        CompassDirection::SouthWest,
        CompassDirection::West,
        CompassDirection::NorthWest,
    ];

    pub fn degrees(self) -> u16 {
        match self {
            CompassDirection::North => 0,
            CompassDirection::NorthEast => 45,
            CompassDirection::East => 90,
            CompassDirection::SouthEast => 135,
            CompassDirection::South => 180,
            CompassDirection::SouthWest => 225,
            CompassDirection::West => 270,
            CompassDirection::NorthWest => 315,
        }
    }

    pub fn from_degrees(degrees: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.degrees() == degrees)
    }

    pub fn label(self) -> &'static str {
        match self {
            CompassDirection::North => "North (0°)",
            CompassDirection::NorthEast => "North-East (45°)",
            CompassDirection::East => "East (90°)",
            CompassDirection::SouthEast => "South-East (135°)",
            CompassDirection::South => "South (180°)",
            CompassDirection::SouthWest => "South-West (225°)",
            CompassDirection::West => "West (270°)",
            CompassDirection::NorthWest => "North-West (315°)",
        }
    }
}

// ─── Feature records ─────────────────────────────────────────────────────────

/// Hourly weather reduced to one mean per channel, keyed by model feature name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct WeatherFeatureRecord {
    pub temperature_2_m_above_gnd: f64,
    pub relative_humidity_2_m_above_gnd: f64,
    #[serde(rename = "mean_sea_level_pressure_MSL")]
    pub mean_sea_level_pressure_msl: f64,
    pub total_precipitation_sfc: f64,
    pub snowfall_amount_sfc: f64,
    pub total_cloud_cover_sfc: f64,
    pub high_cloud_cover_high_cld_lay: f64,
    pub medium_cloud_cover_mid_cld_lay: f64,
    pub low_cloud_cover_low_cld_lay: f64,
    pub shortwave_radiation_backwards_sfc: f64,
    pub wind_speed_10_m_above_gnd: f64,
    pub wind_direction_10_m_above_gnd: f64,
    pub wind_gust_10_m_above_gnd: f64,
}

impl WeatherFeatureRecord {
    /// Builds the record from means given in `WEATHER_CHANNELS` order.
    pub fn from_means(m: [f64; 13]) -> Self {
        Self {
            temperature_2_m_above_gnd: m[0],
            relative_humidity_2_m_above_gnd: m[1],
            mean_sea_level_pressure_msl: m[2],
            total_precipitation_sfc: m[3],
            snowfall_amount_sfc: m[4],
            total_cloud_cover_sfc: m[5],
            high_cloud_cover_high_cld_lay: m[6],
            medium_cloud_cover_mid_cld_lay: m[7],
            low_cloud_cover_low_cld_lay: m[8],
            shortwave_radiation_backwards_sfc: m[9],
            wind_speed_10_m_above_gnd: m[10],
            wind_direction_10_m_above_gnd: m[11],
            wind_gust_10_m_above_gnd: m[12],
        }
    }

    /// Values in `WEATHER_CHANNELS` order.
    pub fn values(&self) -> [f64; 13] {
        [
            self.temperature_2_m_above_gnd,
            self.relative_humidity_2_m_above_gnd,
            self.mean_sea_level_pressure_msl,
            self.total_precipitation_sfc,
            self.snowfall_amount_sfc,
            self.total_cloud_cover_sfc,
            self.high_cloud_cover_high_cld_lay,
            self.medium_cloud_cover_mid_cld_lay,
            self.low_cloud_cover_low_cld_lay,
            self.shortwave_radiation_backwards_sfc,
            self.wind_speed_10_m_above_gnd,
            self.wind_direction_10_m_above_gnd,
            self.wind_gust_10_m_above_gnd,
        ]
    }
}

/// Mean solar geometry over the forward-looking horizon, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct SolarFeatureRecord {
    pub angle_of_incidence: f64,
    pub zenith: f64,
    pub azimuth: f64,
}

impl SolarFeatureRecord {
    pub fn values(&self) -> [f64; 3] {
        [self.angle_of_incidence, self.zenith, self.azimuth]
    }
}

/// Ordered model input. `names[i]` labels `values[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FeatureVector {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Model output in kilowatts, passed through unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Prediction {
    pub kilowatts: f64,
}

impl Prediction {
    pub fn display(&self) -> String {
        format!("{:.2} kW", self.kilowatts)
    }
}

// ─── REST API types ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PredictRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Whole degrees from horizontal, 0..=90
    #[serde(default = "default_tilt")]
    pub tilt_degrees: u8,
    /// One of 0, 45, 90, 135, 180, 225, 270, 315
    #[serde(default = "default_azimuth")]
    pub azimuth_degrees: u16,
    /// IANA zone name, e.g. "Europe/Rome"
    pub timezone: Option<String>,
}

fn default_tilt() -> u8 { 30 }
fn default_azimuth() -> u16 { CompassDirection::default().degrees() }

#[derive(Debug, Serialize, ToSchema)]
pub struct PredictResponse {
    pub prediction: Prediction,
    /// Prediction rendered for display, e.g. "3.42 kW"
    pub display: String,
    pub date_range: DateRange,
    pub weather: WeatherFeatureRecord,
    pub solar: SolarFeatureRecord,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AzimuthOption {
    pub direction: CompassDirection,
    pub label: String,
    pub degrees: u16,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeatureSchema {
    pub feature_names: Vec<String>,
    pub weather_sources: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub feature_count: usize,
}

// ─── Open-Meteo archive wire types ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ArchiveResponse {
    pub hourly: Option<HourlyBlock>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub error: bool,
    pub reason: Option<String>,
}

/// `hourly` object: a shared time axis plus one sample array per variable.
#[derive(Debug, Default, Deserialize)]
pub struct HourlyBlock {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(flatten)]
    pub channels: HashMap<String, Vec<Option<f64>>>,
}
