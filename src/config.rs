use crate::preview::WatermarkStyle;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_WEATHER_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_SOFTWARE_TAG: &str = "GPS-CAM App";
pub const DEFAULT_MAP_DELTA: f64 = 0.002;
pub const WEATHER_API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the capture screen. Every field has a default, so a config
/// file only needs to list what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureConfig {
    pub weather_endpoint: String,
    #[serde(skip_serializing)]
    pub weather_api_key: Option<String>,
    /// Written to the EXIF `Software` tag.
    pub software_tag: String,
    /// Passed to the encoder as-is, 1.0 keeps full quality.
    pub jpeg_compress: f32,
    /// Latitude/longitude span of the embedded map.
    pub map_delta: f64,
    pub watermark: WatermarkStyle,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            weather_endpoint: DEFAULT_WEATHER_ENDPOINT.to_string(),
            weather_api_key: None,
            software_tag: DEFAULT_SOFTWARE_TAG.to_string(),
            jpeg_compress: 1.0,
            map_delta: DEFAULT_MAP_DELTA,
            watermark: WatermarkStyle::default(),
        }
    }
}

impl CaptureConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&raw)?.with_env_overrides())
    }

    /// Applies `OPENWEATHER_API_KEY` when set and non-empty.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(WEATHER_API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.weather_api_key = Some(key);
            }
        }
        self
    }
}
