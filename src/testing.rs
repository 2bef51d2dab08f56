//! In-memory collaborators that record how the orchestrator drives them.

use crate::capabilities::{
    Accuracy, Alert, AlertSink, Camera, CameraError, CaptureOptions, CapturedPhoto,
    EncodeOptions, EncodingError, GeoPoint, ImageProcessor, ImageRef, LocationError,
    LocationProvider, PermissionStatus, PositionFix, Transform, WeatherError, WeatherInfo,
    WeatherProvider,
};
use crate::orchestrator::CaptureOrchestrator;
use crate::session::LocationCoords;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn bandung() -> LocationCoords {
    LocationCoords::new(-6.914_744, 107.609_810)
}

pub fn cloudy() -> WeatherInfo {
    WeatherInfo {
        description: "cloudy".to_string(),
        temperature_celsius: 24.3,
    }
}

pub struct FakeCamera {
    permission: Mutex<PermissionStatus>,
    grant_on_request: bool,
    fail: bool,
    exif: Map<String, Value>,
    hold: bool,
    /// Notified once a held capture has started.
    pub started: Notify,
    /// Lets a held capture finish.
    pub release: Notify,
    pub captures: Mutex<Vec<CaptureOptions>>,
}

impl FakeCamera {
    fn with_permission(permission: PermissionStatus) -> Self {
        let exif = json!({ "Make": "Google", "Model": "Pixel 8", "ISO": 50 });
        Self {
            permission: Mutex::new(permission),
            grant_on_request: true,
            fail: false,
            exif: exif.as_object().cloned().unwrap_or_default(),
            hold: false,
            started: Notify::new(),
            release: Notify::new(),
            captures: Mutex::new(Vec::new()),
        }
    }

    pub fn granted() -> Self {
        Self::with_permission(PermissionStatus::Granted)
    }

    pub fn undetermined() -> Self {
        Self::with_permission(PermissionStatus::Undetermined)
    }

    pub fn refusing_requests(mut self) -> Self {
        self.grant_on_request = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Blocks inside `capture_photo` until `release` is notified.
    pub fn held(mut self) -> Self {
        self.hold = true;
        self
    }

    pub fn capture_count(&self) -> usize {
        self.captures.lock().unwrap().len()
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn permission_status(&self) -> PermissionStatus {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> Result<PermissionStatus, CameraError> {
        let mut permission = self.permission.lock().unwrap();
        if self.grant_on_request {
            *permission = PermissionStatus::Granted;
        } else {
            *permission = PermissionStatus::Denied;
        }
        Ok(*permission)
    }

    async fn capture_photo(&self, options: &CaptureOptions) -> Result<CapturedPhoto, CameraError> {
        let n = {
            let mut captures = self.captures.lock().unwrap();
            captures.push(*options);
            captures.len()
        };
        if self.hold {
            self.started.notify_one();
            self.release.notified().await;
        }
        if self.fail {
            return Err(CameraError::CaptureFailed("shutter jammed".to_string()));
        }
        Ok(CapturedPhoto {
            image: ImageRef::new(format!("/captures/raw-{n}.jpg")),
            exif: self.exif.clone(),
        })
    }
}

pub struct FakeLocation {
    permission: Result<PermissionStatus, LocationError>,
    coords: Option<LocationCoords>,
    fail_refresh: bool,
    fail_on_capture: bool,
    mock_on_capture: bool,
    mock_provider: bool,
    pub requests: Mutex<Vec<Accuracy>>,
}

impl FakeLocation {
    pub fn granted(coords: LocationCoords) -> Self {
        Self {
            permission: Ok(PermissionStatus::Granted),
            coords: Some(coords),
            fail_refresh: false,
            fail_on_capture: false,
            mock_on_capture: false,
            mock_provider: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: Ok(PermissionStatus::Denied),
            coords: None,
            ..Self::granted(bandung())
        }
    }

    pub fn broken_permission_dialog() -> Self {
        Self {
            permission: Err(LocationError::PermissionRequest("dialog crashed".to_string())),
            ..Self::granted(bandung())
        }
    }

    /// Balanced-accuracy fixes fail, high-accuracy ones still succeed.
    pub fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    /// The `Highest` accuracy reading taken after the shutter is flagged as mocked.
    pub fn mocked_on_capture(mut self) -> Self {
        self.mock_on_capture = true;
        self
    }

    /// The `Highest` accuracy reading taken after the shutter fails.
    pub fn failing_on_capture(mut self) -> Self {
        self.fail_on_capture = true;
        self
    }

    /// Every fix comes from a mock location provider.
    pub fn mock_provider(mut self) -> Self {
        self.mock_provider = true;
        self
    }

    pub fn requested(&self) -> Vec<Accuracy> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocationProvider for FakeLocation {
    async fn request_permission(&self) -> Result<PermissionStatus, LocationError> {
        self.permission.clone()
    }

    async fn current_position(&self, accuracy: Accuracy) -> Result<PositionFix, LocationError> {
        self.requests.lock().unwrap().push(accuracy);
        if accuracy == Accuracy::Balanced && self.fail_refresh {
            return Err(LocationError::Unavailable("no fix".to_string()));
        }
        if accuracy == Accuracy::Highest && self.fail_on_capture {
            return Err(LocationError::Unavailable("gnss timeout".to_string()));
        }
        let coords = self
            .coords
            .clone()
            .ok_or_else(|| LocationError::Unavailable("no fix".to_string()))?;
        Ok(PositionFix {
            coords,
            provider_mocked: self.mock_provider,
            reading_mocked: accuracy == Accuracy::Highest && self.mock_on_capture,
        })
    }
}

pub struct FakeWeather {
    response: Mutex<Option<WeatherInfo>>,
    pub calls: Mutex<Vec<GeoPoint>>,
}

impl FakeWeather {
    pub fn returning(info: WeatherInfo) -> Self {
        Self {
            response: Mutex::new(Some(info)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `None` makes later lookups fail with a network error.
    pub fn set_response(&self, response: Option<WeatherInfo>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn current_weather(&self, at: GeoPoint) -> Result<WeatherInfo, WeatherError> {
        self.calls.lock().unwrap().push(at);
        self.response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| WeatherError::Network("connection refused".to_string()))
    }
}

#[derive(Default)]
pub struct FakeProcessor {
    fail: bool,
    pub calls: Mutex<Vec<(ImageRef, Vec<Transform>, EncodeOptions)>>,
}

impl FakeProcessor {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageProcessor for FakeProcessor {
    async fn reencode(
        &self,
        source: &ImageRef,
        transforms: &[Transform],
        options: &EncodeOptions,
    ) -> Result<ImageRef, EncodingError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((source.clone(), transforms.to_vec(), options.clone()));
            calls.len()
        };
        if self.fail {
            return Err(EncodingError::InvalidSource(source.to_string()));
        }
        Ok(ImageRef::new(format!("/captures/stamped-{n}.jpg")))
    }
}

#[derive(Default)]
pub struct RecordingAlerts {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlerts {
    pub fn recorded(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingAlerts {
    fn alert(&self, alert: Alert) {
        self.alerts.lock().unwrap().push(alert);
    }
}

/// One set of fakes wired into an orchestrator, kept around for assertions.
pub struct Harness {
    pub camera: Arc<FakeCamera>,
    pub location: Arc<FakeLocation>,
    pub weather: Arc<FakeWeather>,
    pub processor: Arc<FakeProcessor>,
    pub alerts: Arc<RecordingAlerts>,
}

impl Harness {
    pub fn new(camera: FakeCamera, location: FakeLocation) -> Self {
        Self {
            camera: Arc::new(camera),
            location: Arc::new(location),
            weather: Arc::new(FakeWeather::returning(cloudy())),
            processor: Arc::new(FakeProcessor::default()),
            alerts: Arc::new(RecordingAlerts::default()),
        }
    }

    pub fn happy() -> Self {
        Self::new(FakeCamera::granted(), FakeLocation::granted(bandung()))
    }

    pub fn with_weather(mut self, weather: FakeWeather) -> Self {
        self.weather = Arc::new(weather);
        self
    }

    pub fn with_processor(mut self, processor: FakeProcessor) -> Self {
        self.processor = Arc::new(processor);
        self
    }

    pub fn orchestrator(&self) -> CaptureOrchestrator {
        CaptureOrchestrator::builder()
            .camera(self.camera.clone())
            .location(self.location.clone())
            .weather(self.weather.clone())
            .processor(self.processor.clone())
            .alerts(self.alerts.clone())
            .build()
    }

    pub async fn mounted(&self) -> CaptureOrchestrator {
        let orchestrator = self.orchestrator();
        orchestrator.mount().await;
        orchestrator
    }
}
