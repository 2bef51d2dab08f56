use crate::CaptureError;
use crate::capabilities::exif::geotag_exif;
use crate::capabilities::{
    Accuracy, Alert, AlertSink, Camera, CameraFacing, CaptureOptions, EncodeOptions, GeoPoint,
    ImageFormat, ImageProcessor, ImageRef, LocationProvider, LogAlerts, WeatherProvider,
};
use crate::config::CaptureConfig;
use crate::error::PermissionKind;
use crate::preview::build_overlay;
use crate::session::{
    CaptureSession, LocationCoords, LocationPermission, PendingCapture, ScreenState,
    SessionSnapshot,
};
use crate::time::CaptureTime;
use bon::bon;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

/// Drives one visit to the capture screen.
///
/// Holds the capability handles and the session state. All operations take
/// `&self`, so the orchestrator can be shared between the view and
/// background tasks behind an `Arc`. Only one `capture()` runs at a time.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use gps_cam::capabilities::desktop::{FixedLocation, StillFileCamera};
/// # use gps_cam::capabilities::exif::ExifToolProcessor;
/// # use gps_cam::capabilities::weather::OpenWeatherClient;
/// # use gps_cam::{CaptureOrchestrator, LocationCoords};
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let orchestrator = CaptureOrchestrator::builder()
///     .camera(Arc::new(StillFileCamera::new("scene.jpg", "out")))
///     .location(Arc::new(FixedLocation::new(LocationCoords::new(-6.9147, 107.6098))))
///     .weather(Arc::new(OpenWeatherClient::new(
///         "https://api.openweathermap.org/data/2.5/weather",
///         "key",
///     )?))
///     .processor(Arc::new(ExifToolProcessor::new("out")?))
///     .build();
///
/// orchestrator.mount().await;
/// let image = orchestrator.capture().await?;
/// println!("stamped photo at {image}");
/// # Ok(())
/// # }
/// ```
pub struct CaptureOrchestrator {
    camera: Arc<dyn Camera>,
    location: Arc<dyn LocationProvider>,
    weather: Arc<dyn WeatherProvider>,
    processor: Arc<dyn ImageProcessor>,
    alerts: Arc<dyn AlertSink>,
    config: CaptureConfig,
    session: RwLock<CaptureSession>,
    capturing: AtomicBool,
}

fn default_alerts() -> Arc<dyn AlertSink> {
    Arc::new(LogAlerts)
}

#[bon]
impl CaptureOrchestrator {
    /// Constructs a `CaptureOrchestrator` via a builder pattern.
    ///
    /// # Builder Arguments
    ///
    /// * `camera`, `location`, `weather`, `processor` - The capability handles. Required.
    /// * `alerts: Arc<dyn AlertSink>` - (Default: [`LogAlerts`]) Where user-facing alerts go.
    /// * `config: CaptureConfig` - (Default: [`CaptureConfig::default`]) EXIF software tag,
    ///   encoder quality and overlay layout.
    #[builder]
    pub fn new(
        camera: Arc<dyn Camera>,
        location: Arc<dyn LocationProvider>,
        weather: Arc<dyn WeatherProvider>,
        processor: Arc<dyn ImageProcessor>,
        #[builder(default = default_alerts())] alerts: Arc<dyn AlertSink>,
        #[builder(default)] config: CaptureConfig,
    ) -> Self {
        Self {
            camera,
            location,
            weather,
            processor,
            alerts,
            config,
            session: RwLock::new(CaptureSession::default()),
            capturing: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Screen entry: resolves location permission (fetching a first fix when
    /// granted) and reads the current camera permission.
    pub async fn mount(&self) {
        self.request_location_access().await;
        let camera_granted = self.camera.permission_status().await.is_granted();
        self.session.write().await.camera_permission_granted = camera_granted;
        debug!(camera_granted, "capture screen mounted");
    }

    /// Asks for foreground location permission. A failing request is
    /// treated as a denial and never surfaces to the caller.
    pub async fn request_location_access(&self) {
        let permission = match self.location.request_permission().await {
            Ok(status) => LocationPermission::from(status),
            Err(e) => {
                warn!(error = %e, "location permission request failed");
                LocationPermission::Denied
            }
        };
        self.session.write().await.location_permission = permission;

        if permission == LocationPermission::Granted {
            self.refresh_location().await;
        }
    }

    /// Replaces the cached location with a balanced-accuracy fix. On failure
    /// the previous value is kept.
    pub async fn refresh_location(&self) {
        match self.location.current_position(Accuracy::Balanced).await {
            Ok(fix) => {
                let (lat, lon) = (fix.coords.latitude, fix.coords.longitude);
                debug!(lat, lon, "location refreshed");
                self.session.write().await.current_location = Some(fix.coords);
            }
            Err(e) => {
                warn!(error = %e, "location refresh failed");
                self.alerts.alert(Alert::LocationFailed);
            }
        }
    }

    /// The "grant permission" action of the camera gate.
    ///
    /// # Errors
    ///
    /// * [`CaptureError::CaptureDeviceFailure`] if the permission dialog itself fails.
    /// * [`CaptureError::PermissionDenied`] if the user refuses.
    pub async fn request_camera_access(&self) -> Result<(), CaptureError> {
        let status = self.camera.request_permission().await?;
        let granted = status.is_granted();
        self.session.write().await.camera_permission_granted = granted;
        if granted {
            Ok(())
        } else {
            Err(CaptureError::PermissionDenied(PermissionKind::Camera))
        }
    }

    /// Takes a geotagged photo and moves the screen to the photo preview.
    ///
    /// Weather and the location refresh are best-effort and only raise an
    /// alert. Any other failure raises a single alert, discards the raw
    /// photo and is returned.
    ///
    /// # Errors
    ///
    /// * [`CaptureError::CaptureInProgress`] while another capture is running.
    /// * [`CaptureError::NotReady`] outside the live preview.
    /// * [`CaptureError::SpoofedLocationDetected`] when the post-shutter fix is mocked.
    /// * [`CaptureError::CaptureDeviceFailure`], [`CaptureError::LocationUnavailable`] or
    ///   [`CaptureError::EncodingFailure`] from the collaborators.
    #[instrument(skip(self))]
    pub async fn capture(&self) -> Result<ImageRef, CaptureError> {
        let _guard = CaptureGuard::acquire(&self.capturing)?;

        let screen = self.session.read().await.screen();
        if screen != ScreenState::LivePreview {
            return Err(CaptureError::NotReady(screen));
        }

        match self.run_capture().await {
            Ok(image) => Ok(image),
            Err(e) => {
                self.session.write().await.pending_capture = None;
                if matches!(e, CaptureError::SpoofedLocationDetected) {
                    warn!("mocked location reported, photo discarded");
                    self.alerts.alert(Alert::FakeGpsDetected);
                } else {
                    error!(error = %e, "capture failed");
                    self.alerts.alert(Alert::CaptureFailed);
                }
                Err(e)
            }
        }
    }

    async fn run_capture(&self) -> Result<ImageRef, CaptureError> {
        let permission = self.session.read().await.location_permission;
        match permission {
            LocationPermission::Unknown => self.request_location_access().await,
            LocationPermission::Granted => self.refresh_location().await,
            LocationPermission::Denied => debug!("location denied, not asking again"),
        }

        let location = self.session.read().await.current_location.clone();
        match &location {
            Some(coords) => self.update_weather(coords).await,
            None => debug!("no location yet, weather lookup skipped"),
        }

        let facing = self.session.read().await.camera_facing;
        let photo = self
            .camera
            .capture_photo(&CaptureOptions {
                include_exif: true,
                facing,
            })
            .await?;
        let time = CaptureTime::now(location.as_ref());
        self.session.write().await.pending_capture = Some(PendingCapture {
            photo: photo.clone(),
            time: time.clone(),
        });
        debug!(image = %photo.image, "raw photo pending");

        let fix = self.location.current_position(Accuracy::Highest).await?;
        if fix.is_spoofed() {
            return Err(CaptureError::SpoofedLocationDetected);
        }

        let committed = match &location {
            Some(coords) => {
                let options = EncodeOptions {
                    compress: self.config.jpeg_compress,
                    format: ImageFormat::Jpeg,
                    exif: geotag_exif(&photo.exif, coords, &time, &self.config.software_tag),
                };
                self.processor.reencode(&photo.image, &[], &options).await?
            }
            None => photo.image,
        };

        let mut session = self.session.write().await;
        session.pending_capture = None;
        session.captured_image = Some(committed.clone());
        session.capture_time = Some(time);
        info!(image = %committed, "photo committed");
        Ok(committed)
    }

    async fn update_weather(&self, coords: &LocationCoords) {
        match self.weather.current_weather(GeoPoint::from(coords)).await {
            Ok(info) => self.session.write().await.current_weather = Some(info),
            Err(e) => {
                warn!(error = %e, "weather lookup failed");
                self.alerts.alert(Alert::WeatherFailed);
            }
        }
    }

    /// Drops the committed photo. Permissions and the cached location and
    /// weather survive.
    pub async fn retake(&self) {
        self.session.write().await.clear_capture();
    }

    pub async fn toggle_camera_facing(&self) -> CameraFacing {
        let mut session = self.session.write().await;
        session.camera_facing = session.camera_facing.flipped();
        session.camera_facing
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.read().await;
        let screen = session.screen();
        let overlay = session.captured_image.as_ref().map(|_| {
            build_overlay(
                session.capture_time.as_ref(),
                session.current_location.as_ref(),
                session.current_weather.as_ref(),
                self.config.map_delta,
                self.config.watermark,
            )
        });

        SessionSnapshot {
            screen,
            camera_facing: session.camera_facing,
            location_permission: session.location_permission,
            camera_permission_granted: session.camera_permission_granted,
            current_location: session.current_location.clone(),
            current_weather: session.current_weather.clone(),
            captured_image: session.captured_image.clone(),
            capture_timestamp: session.capture_time.as_ref().map(|t| t.display.clone()),
            capture_enabled: screen == ScreenState::LivePreview
                && !self.capturing.load(Ordering::Acquire),
            overlay,
        }
    }
}

/// Holds the in-flight flag for the duration of one capture.
struct CaptureGuard<'a>(&'a AtomicBool);

impl<'a> CaptureGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, CaptureError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CaptureError::CaptureInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
