//! What the photo-preview screen shows: the stamped photo with a faint
//! watermark in the corner, the time/coordinates/weather lines and a small
//! fixed map around the capture point.

use crate::capabilities::{GeoPoint, ImageRef, WeatherInfo};
use crate::session::LocationCoords;
use crate::time::CaptureTime;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preview worker task failed")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatermarkStyle {
    pub opacity: f32,
    /// Edge of the square box the watermark is fitted into, in pixels.
    pub size: u32,
    /// Distance from the bottom-right corner, in pixels.
    pub margin: u32,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            opacity: 0.2,
            size: 100,
            margin: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayKind {
    Time,
    Coordinates,
    Weather,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayLine {
    pub kind: OverlayKind,
    pub icon: &'static str,
    pub text: String,
}

/// Non-interactive map centered on the capture point, with a marker there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRegion {
    pub center: GeoPoint,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
    pub marker: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewOverlay {
    pub lines: Vec<OverlayLine>,
    pub map: Option<MapRegion>,
    pub watermark: WatermarkStyle,
}

impl PreviewOverlay {
    pub fn line(&self, kind: OverlayKind) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| line.kind == kind)
            .map(|line| line.text.as_str())
    }
}

pub fn build_overlay(
    time: Option<&CaptureTime>,
    location: Option<&LocationCoords>,
    weather: Option<&WeatherInfo>,
    map_delta: f64,
    watermark: WatermarkStyle,
) -> PreviewOverlay {
    let mut lines = Vec::with_capacity(3);
    if let Some(time) = time {
        lines.push(OverlayLine {
            kind: OverlayKind::Time,
            icon: "🕒",
            text: time.display.clone(),
        });
    }
    if let Some(coords) = location {
        lines.push(OverlayLine {
            kind: OverlayKind::Coordinates,
            icon: "📍",
            text: format!("{:.6}, {:.6}", coords.latitude, coords.longitude),
        });
    }
    if let Some(weather) = weather {
        lines.push(OverlayLine {
            kind: OverlayKind::Weather,
            icon: "☁️",
            text: format!(
                "{}, {:.1}°C",
                weather.description, weather.temperature_celsius
            ),
        });
    }

    let map = location.map(|coords| {
        let point = GeoPoint::from(coords);
        MapRegion {
            center: point,
            latitude_delta: map_delta,
            longitude_delta: map_delta,
            marker: point,
        }
    });

    PreviewOverlay {
        lines,
        map,
        watermark,
    }
}

/// Blends `watermark` into the bottom-right corner of `photo`.
pub fn compose_preview(
    photo: &DynamicImage,
    watermark: &DynamicImage,
    style: &WatermarkStyle,
) -> RgbaImage {
    let mut base = photo.to_rgba8();
    let size = style.size.max(1);
    let mut mark = watermark.resize(size, size, imageops::FilterType::Triangle).to_rgba8();

    let opacity = style.opacity.clamp(0.0, 1.0);
    for pixel in mark.pixels_mut() {
        pixel.0[3] = (f32::from(pixel.0[3]) * opacity).round() as u8;
    }

    let (width, height) = photo.dimensions();
    let x = width.saturating_sub(style.margin.saturating_add(mark.width()));
    let y = height.saturating_sub(style.margin.saturating_add(mark.height()));
    imageops::overlay(&mut base, &mark, i64::from(x), i64::from(y));
    base
}

pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, PreviewError> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut bytes = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    DynamicImage::ImageRgb8(rgb).write_with_encoder(encoder)?;
    Ok(bytes.into_inner())
}

/// Loads the committed photo and the watermark, composes them and writes
/// the result as JPEG to `output`.
#[instrument(skip(style))]
pub async fn render_preview_file(
    photo: &ImageRef,
    watermark: &Path,
    style: WatermarkStyle,
    output: &Path,
) -> Result<PathBuf, PreviewError> {
    let photo = photo.path().to_path_buf();
    let watermark = watermark.to_path_buf();
    let output = output.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<PathBuf, PreviewError> {
        let composed = compose_preview(&image::open(&photo)?, &image::open(&watermark)?, &style);
        std::fs::write(&output, encode_jpeg(&composed, 90)?)?;
        Ok(output)
    })
    .await?
}
