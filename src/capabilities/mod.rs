//! Capability handles the orchestrator is constructed with.
//!
//! Each external collaborator (camera, geolocation, weather service, image
//! encoder and the user-facing alert surface) sits behind a trait so the
//! capture sequence can run against platform shells or test doubles alike.

pub mod desktop;
pub mod error;
pub mod exif;
pub mod weather;

use crate::session::LocationCoords;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub use error::{CameraError, EncodingError, LocationError, WeatherError};

/// Opaque handle to an image produced by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(PathBuf);

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CameraFacing {
    Front,
    #[default]
    Back,
}

impl CameraFacing {
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub include_exif: bool,
    pub facing: CameraFacing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPhoto {
    pub image: ImageRef,
    /// Metadata reported by the camera, keyed by EXIF tag name.
    pub exif: Map<String, Value>,
}

#[async_trait]
pub trait Camera: Send + Sync {
    async fn permission_status(&self) -> PermissionStatus;

    async fn request_permission(&self) -> Result<PermissionStatus, CameraError>;

    async fn capture_photo(&self, options: &CaptureOptions) -> Result<CapturedPhoto, CameraError>;
}

/// Accuracy hint passed to the geolocation provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Accuracy {
    Lowest,
    Low,
    #[default]
    Balanced,
    High,
    Highest,
    BestForNavigation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFix {
    pub coords: LocationCoords,
    /// The provider itself is a mock location source.
    pub provider_mocked: bool,
    /// This particular reading was flagged as simulated.
    pub reading_mocked: bool,
}

impl PositionFix {
    pub fn is_spoofed(&self) -> bool {
        self.provider_mocked || self.reading_mocked
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> Result<PermissionStatus, LocationError>;

    async fn current_position(&self, accuracy: Accuracy) -> Result<PositionFix, LocationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&LocationCoords> for GeoPoint {
    fn from(coords: &LocationCoords) -> Self {
        Self {
            latitude: coords.latitude,
            longitude: coords.longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherInfo {
    pub description: String,
    pub temperature_celsius: f64,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_weather(&self, at: GeoPoint) -> Result<WeatherInfo, WeatherError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Geometric transform applied before re-encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Transform {
    Rotate90,
    Rotate180,
    Rotate270,
    FlipHorizontal,
    FlipVertical,
    Resize { width: u32, height: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    /// 0.0 (smallest file) to 1.0 (best quality).
    pub compress: f32,
    pub format: ImageFormat,
    pub exif: Map<String, Value>,
}

#[async_trait]
pub trait ImageProcessor: Send + Sync {
    async fn reencode(
        &self,
        source: &ImageRef,
        transforms: &[Transform],
        options: &EncodeOptions,
    ) -> Result<ImageRef, EncodingError>;
}

/// One-shot messages shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alert {
    LocationFailed,
    WeatherFailed,
    CaptureFailed,
    FakeGpsDetected,
}

impl Alert {
    pub fn message(self) -> &'static str {
        match self {
            Self::LocationFailed => "Failed to get location",
            Self::WeatherFailed => "Failed to get weather information",
            Self::CaptureFailed => "Failed to take photo",
            Self::FakeGpsDetected => {
                "A fake location app was detected on this device. Turn off fake GPS before continuing."
            }
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

pub trait AlertSink: Send + Sync {
    fn alert(&self, alert: Alert);
}

/// Alert sink for headless shells: alerts only go to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn alert(&self, alert: Alert) {
        match alert {
            Alert::FakeGpsDetected | Alert::CaptureFailed => warn!(?alert, "{}", alert.message()),
            _ => info!(?alert, "{}", alert.message()),
        }
    }
}
