use crate::capabilities::error::WeatherError;
use crate::capabilities::{GeoPoint, WeatherInfo, WeatherProvider};
use crate::config::CaptureConfig;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

/// Temperatures are requested in Celsius.
const UNITS: &str = "metric";

/// Current-conditions client for the OpenWeatherMap `data/2.5/weather` API.
#[derive(Clone)]
pub struct OpenWeatherClient {
    endpoint: Url,
    api_key: String,
}

// The key never goes to the log.
impl std::fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl OpenWeatherClient {
    pub fn new(endpoint: &str, api_key: impl Into<String>) -> Result<Self, WeatherError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &CaptureConfig) -> Result<Self, WeatherError> {
        let api_key = config
            .weather_api_key
            .clone()
            .ok_or(WeatherError::MissingApiKey)?;
        Self::new(&config.weather_endpoint, api_key)
    }

    pub fn request_url(&self, at: GeoPoint) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("lat", &at.latitude.to_string())
            .append_pair("lon", &at.longitude.to_string())
            .append_pair("appid", &self.api_key)
            .append_pair("units", UNITS);
        url
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    #[instrument(skip(self))]
    async fn current_weather(&self, at: GeoPoint) -> Result<WeatherInfo, WeatherError> {
        let url = self.request_url(at);
        let payload = tokio::task::spawn_blocking(move || fetch_json(&url)).await??;
        debug!(%payload, "weather response");
        parse_weather_response(&payload)
    }
}

fn fetch_json(url: &Url) -> Result<Value, WeatherError> {
    // ureq errors embed the request URL, so only the error kind is kept.
    match ureq::get(url.as_str()).call() {
        Ok(response) => response
            .into_json::<Value>()
            .map_err(|e| WeatherError::Network(e.kind().to_string())),
        Err(ureq::Error::Status(code, _)) => Err(WeatherError::Status(code)),
        Err(e) => Err(WeatherError::Network(e.kind().to_string())),
    }
}

/// Extracts `weather[0].description` and `main.temp` from a current-conditions payload.
pub fn parse_weather_response(payload: &Value) -> Result<WeatherInfo, WeatherError> {
    let description = payload
        .pointer("/weather/0/description")
        .and_then(Value::as_str)
        .ok_or(WeatherError::Malformed("weather[0].description"))?;
    let temperature_celsius = payload
        .pointer("/main/temp")
        .and_then(Value::as_f64)
        .ok_or(WeatherError::Malformed("main.temp"))?;

    Ok(WeatherInfo {
        description: description.to_string(),
        temperature_celsius,
    })
}
