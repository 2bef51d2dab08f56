use crate::capabilities::{CameraFacing, CapturedPhoto, ImageRef, PermissionStatus, WeatherInfo};
use crate::preview::PreviewOverlay;
use crate::time::CaptureTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCoords {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
}

impl LocationCoords {
    /// Coordinates with only the required fields set.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            altitude: None,
            altitude_accuracy: None,
            heading: None,
            speed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationPermission {
    #[default]
    Unknown,
    Granted,
    Denied,
}

impl From<PermissionStatus> for LocationPermission {
    fn from(status: PermissionStatus) -> Self {
        if status.is_granted() {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

/// Raw photo held between the shutter and the final commit.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCapture {
    pub photo: CapturedPhoto,
    pub time: CaptureTime,
}

/// Transient state of one visit to the capture screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureSession {
    pub camera_facing: CameraFacing,
    pub location_permission: LocationPermission,
    pub camera_permission_granted: bool,
    pub current_location: Option<LocationCoords>,
    pub current_weather: Option<WeatherInfo>,
    pub captured_image: Option<ImageRef>,
    pub capture_time: Option<CaptureTime>,
    pub pending_capture: Option<PendingCapture>,
}

impl CaptureSession {
    pub fn screen(&self) -> ScreenState {
        if self.location_permission != LocationPermission::Granted {
            return ScreenState::PermissionGate(GateReason::Location(self.location_permission));
        }
        if !self.camera_permission_granted {
            return ScreenState::PermissionGate(GateReason::Camera);
        }
        if self.captured_image.is_some() {
            ScreenState::PhotoPreview
        } else {
            ScreenState::LivePreview
        }
    }

    /// Drops the committed photo and its timestamp. Permissions and the
    /// last location/weather readings are kept.
    pub fn clear_capture(&mut self) {
        self.captured_image = None;
        self.capture_time = None;
        self.pending_capture = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "reason")]
pub enum ScreenState {
    PermissionGate(GateReason),
    LivePreview,
    PhotoPreview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GateReason {
    /// Location is still unresolved or was denied.
    Location(LocationPermission),
    Camera,
}

impl GateReason {
    pub fn messages(self) -> [&'static str; 2] {
        match self {
            Self::Location(_) => [
                "No access to location",
                "Please grant permission in the device settings",
            ],
            Self::Camera => [
                "No access to camera",
                "Please grant permission in the device settings",
            ],
        }
    }

    /// Only the camera gate offers an in-app "grant permission" action.
    pub fn can_request(self) -> bool {
        matches!(self, Self::Camera)
    }
}

/// Read-only view of the session handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub screen: ScreenState,
    pub camera_facing: CameraFacing,
    pub location_permission: LocationPermission,
    pub camera_permission_granted: bool,
    pub current_location: Option<LocationCoords>,
    pub current_weather: Option<WeatherInfo>,
    pub captured_image: Option<ImageRef>,
    pub capture_timestamp: Option<String>,
    pub capture_enabled: bool,
    pub overlay: Option<PreviewOverlay>,
}
