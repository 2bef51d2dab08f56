use crate::capabilities::{CameraError, EncodingError, LocationError, WeatherError};
use crate::session::ScreenState;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionKind {
    Camera,
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => f.write_str("camera"),
        }
    }
}

/// The primary error type for the gps-cam crate.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Permission denied: {0}")]
    PermissionDenied(PermissionKind),

    #[error("Location unavailable: {0}")]
    LocationUnavailable(#[from] LocationError),

    #[error("Weather lookup failed: {0}")]
    NetworkFailure(#[from] WeatherError),

    #[error("Camera failed: {0}")]
    CaptureDeviceFailure(#[from] CameraError),

    // --- Capture sequence aborts ---
    #[error("A mocked location was reported, the capture was discarded")]
    SpoofedLocationDetected,

    #[error("Could not write the stamped photo: {0}")]
    EncodingFailure(#[from] EncodingError),

    // --- Calls outside the live preview ---
    #[error("A capture is already running")]
    CaptureInProgress,

    #[error("Capture is not available in screen state {0:?}")]
    NotReady(ScreenState),
}
