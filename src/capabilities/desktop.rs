//! Collaborators for running the capture flow on a desktop, where there is no
//! shutter or GNSS receiver: the "camera" snapshots an existing image file and
//! the location is supplied up front.

use crate::capabilities::error::{CameraError, LocationError};
use crate::capabilities::{
    Accuracy, Camera, CaptureOptions, CapturedPhoto, ImageRef, LocationProvider, PermissionStatus,
    PositionFix,
};
use crate::session::LocationCoords;
use async_trait::async_trait;
use chrono::Utc;
use exiftool::ExifTool;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument};

pub struct StillFileCamera {
    source: PathBuf,
    output_dir: PathBuf,
    exiftool: Option<Arc<Mutex<ExifTool>>>,
}

impl StillFileCamera {
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            exiftool: None,
        }
    }

    /// Reads the source's metadata with exiftool when EXIF is requested.
    #[must_use]
    pub fn with_exiftool(mut self, exiftool: ExifTool) -> Self {
        self.exiftool = Some(Arc::new(Mutex::new(exiftool)));
        self
    }
}

#[async_trait]
impl Camera for StillFileCamera {
    async fn permission_status(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request_permission(&self) -> Result<PermissionStatus, CameraError> {
        Ok(PermissionStatus::Granted)
    }

    #[instrument(skip(self), fields(source = %self.source.display()))]
    async fn capture_photo(&self, options: &CaptureOptions) -> Result<CapturedPhoto, CameraError> {
        let source = self.source.clone();
        let output_dir = self.output_dir.clone();
        let exiftool = options
            .include_exif
            .then(|| self.exiftool.clone())
            .flatten();

        tokio::task::spawn_blocking(move || {
            snapshot_file(&source, &output_dir, exiftool.as_deref())
        })
        .await
        .map_err(|e| CameraError::CaptureFailed(e.to_string()))?
    }
}

fn snapshot_file(
    source: &Path,
    output_dir: &Path,
    exiftool: Option<&Mutex<ExifTool>>,
) -> Result<CapturedPhoto, CameraError> {
    if !source.is_file() {
        return Err(CameraError::Unavailable(format!(
            "no image at {}",
            source.display()
        )));
    }
    let extension = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg");
    let target = output_dir.join(format!(
        "capture-{}.{extension}",
        Utc::now().timestamp_millis()
    ));
    std::fs::copy(source, &target).map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

    let exif = match exiftool {
        Some(exiftool) => read_exif(exiftool, &target)?,
        None => Map::new(),
    };
    debug!(target_file = %target.display(), tags = exif.len(), "photo captured");

    Ok(CapturedPhoto {
        image: ImageRef::new(target),
        exif,
    })
}

fn read_exif(exiftool: &Mutex<ExifTool>, path: &Path) -> Result<Map<String, Value>, CameraError> {
    let value = exiftool
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .json(path, &["-n", "-EXIF:all"])
        .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
    let mut exif = match value {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    exif.remove("SourceFile");
    Ok(exif)
}

/// A location provider pinned to one coordinate.
#[derive(Debug, Clone)]
pub struct FixedLocation {
    coords: LocationCoords,
    permission: PermissionStatus,
    mocked: bool,
}

impl FixedLocation {
    pub fn new(coords: LocationCoords) -> Self {
        Self {
            coords,
            permission: PermissionStatus::Granted,
            mocked: false,
        }
    }

    #[must_use]
    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.permission = permission;
        self
    }

    /// Reports every reading as coming from a mock provider.
    #[must_use]
    pub fn mocked(mut self, mocked: bool) -> Self {
        self.mocked = mocked;
        self
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_permission(&self) -> Result<PermissionStatus, LocationError> {
        Ok(self.permission)
    }

    async fn current_position(&self, accuracy: Accuracy) -> Result<PositionFix, LocationError> {
        if !self.permission.is_granted() {
            return Err(LocationError::ServicesDisabled);
        }
        debug!(?accuracy, "fixed position requested");
        Ok(PositionFix {
            coords: self.coords.clone(),
            provider_mocked: self.mocked,
            reading_mocked: false,
        })
    }
}
