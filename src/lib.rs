//! # GPS Cam
//!
//! The capture screen of a geotagging camera, as a library.
//!
//! A [`CaptureOrchestrator`] takes a photo, stamps it with where and when it
//! was taken and what the weather was like, and exposes the resulting screen
//! state for a view to render.
//!
//! ## Key Features
//!
//! - **Permission gating**: location and camera permission decide whether the live preview is shown at all.
//! - **Location**: a balanced-accuracy fix is cached on entry and refreshed before every capture.
//! - **Weather**: current conditions from OpenWeatherMap, best-effort.
//! - **Anti-spoofing**: a high-accuracy fix taken after the shutter must not come from a mock provider, otherwise the photo is thrown away.
//! - **EXIF stamping**: GPS coordinates with hemisphere refs, `DateTimeOriginal` and `Software` are merged into the camera's own EXIF.
//! - **Preview overlay**: time in the capture location's timezone, coordinates, weather, a small map and a watermark.
//!
//! ## Usage
//!
//! Construct the orchestrator with capability handles for the camera,
//! geolocation, weather service and image encoder. The [`capabilities::desktop`]
//! module has file-backed stand-ins for running without camera hardware.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gps_cam::capabilities::desktop::{FixedLocation, StillFileCamera};
//! use gps_cam::capabilities::exif::ExifToolProcessor;
//! use gps_cam::capabilities::weather::OpenWeatherClient;
//! use gps_cam::{CaptureConfig, CaptureOrchestrator, LocationCoords};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CaptureConfig::default().with_env_overrides();
//!     let orchestrator = CaptureOrchestrator::builder()
//!         .camera(Arc::new(StillFileCamera::new("assets/scene.jpg", "out")))
//!         .location(Arc::new(FixedLocation::new(LocationCoords::new(-6.914744, 107.609810))))
//!         .weather(Arc::new(OpenWeatherClient::from_config(&config)?))
//!         .processor(Arc::new(ExifToolProcessor::new("out")?))
//!         .config(config)
//!         .build();
//!
//!     orchestrator.mount().await;
//!     orchestrator.capture().await?;
//!
//!     let snapshot = orchestrator.snapshot().await;
//!     println!("Taken at: {:?}", snapshot.capture_timestamp);
//!     println!("Weather: {:?}", snapshot.current_weather);
//!
//!     Ok(())
//! }
//! ```

pub mod capabilities;
pub mod config;
pub mod orchestrator;
pub mod preview;
pub mod session;
pub mod time;

mod error;
#[cfg(test)]
mod testing;

pub use config::CaptureConfig;
pub use error::{CaptureError, PermissionKind};
pub use orchestrator::CaptureOrchestrator;
pub use session::{LocationCoords, ScreenState, SessionSnapshot};
