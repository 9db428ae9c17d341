use chrono_tz::Tz;
use serde::Deserialize;

fn default_port() -> u16 { 8080 }
fn default_archive_url() -> String { "https://archive-api.open-meteo.com/v1/archive".to_string() }
fn default_timeout_s() -> u64 { 30 }
fn default_scaler_path() -> String { "artifacts/standardscaler.json".to_string() }
fn default_model_path() -> String { "artifacts/solar_power_model.json".to_string() }
fn default_timezone() -> Tz { chrono_tz::Asia::Kolkata }

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    /// Zone used for locations that do not name one
    #[serde(default = "default_timezone")]
    pub default_timezone: Tz,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default = "default_archive_url")]
    pub archive_url: String,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArtifactsConfig {
    #[serde(default = "default_scaler_path")]
    pub scaler_path: String,
    #[serde(default = "default_model_path")]
    pub model_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self { archive_url: default_archive_url(), timeout_s: default_timeout_s() }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self { scaler_path: default_scaler_path(), model_path: default_model_path() }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_takes_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.weather.timeout_s, 30);
        assert!(config.weather.archive_url.starts_with("https://archive-api.open-meteo.com"));
        assert_eq!(config.default_timezone, chrono_tz::Asia::Kolkata);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"server":{"port":9000},"weather":{"timeout_s":5},"default_timezone":"Europe/Rome"}"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.weather.timeout_s, 5);
        assert_eq!(config.artifacts.model_path, "artifacts/solar_power_model.json");
        assert_eq!(config.default_timezone, chrono_tz::Europe::Rome);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{"default_timezone":"Mars/Olympus"}"#).is_err());
    }
}
