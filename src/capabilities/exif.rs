use crate::capabilities::error::EncodingError;
use crate::capabilities::{EncodeOptions, ImageFormat, ImageProcessor, ImageRef, Transform};
use crate::session::LocationCoords;
use crate::time::CaptureTime;
use async_trait::async_trait;
use exiftool::ExifTool;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument};

pub fn latitude_ref(latitude: f64) -> &'static str {
    if latitude >= 0.0 { "N" } else { "S" }
}

pub fn longitude_ref(longitude: f64) -> &'static str {
    if longitude >= 0.0 { "E" } else { "W" }
}

/// Merges the camera's own EXIF with the capture location, time and app tag.
/// The added tags win over anything the camera reported under the same name.
pub fn geotag_exif(
    original: &Map<String, Value>,
    coords: &LocationCoords,
    time: &CaptureTime,
    software: &str,
) -> Map<String, Value> {
    let mut exif = original.clone();
    exif.insert("GPSLatitude".into(), coords.latitude.into());
    exif.insert("GPSLongitude".into(), coords.longitude.into());
    exif.insert("GPSLatitudeRef".into(), latitude_ref(coords.latitude).into());
    exif.insert("GPSLongitudeRef".into(), longitude_ref(coords.longitude).into());
    exif.insert("DateTimeOriginal".into(), time.iso8601().into());
    exif.insert("Software".into(), software.into());
    exif
}

/// Builds the exiftool argument list writing `exif` into `target` in place.
///
/// The stay-open exiftool process reads one argument per line, so values
/// spanning lines are skipped along with non-scalars and the
/// `(Binary data ...)` placeholders exiftool prints instead of blobs.
/// Values are written with `-n`, matching how they were read.
pub fn exif_write_args(exif: &Map<String, Value>, target: &Path) -> Vec<String> {
    let mut args: Vec<String> = exif
        .iter()
        .filter(|(tag, _)| is_tag_name(tag))
        .filter_map(|(tag, value)| {
            let value = match value {
                Value::String(s) if s.contains(['\n', '\r']) => return None,
                Value::String(s) if s.starts_with("(Binary data") => return None,
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => u8::from(*b).to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => return None,
            };
            Some(format!("-{tag}={value}"))
        })
        .collect();
    args.push("-n".to_string());
    args.push("-m".to_string());
    args.push("-overwrite_original".to_string());
    args.push(target.to_string_lossy().into_owned());
    args
}

// Plain or group-qualified names only, e.g. `Make` or `EXIF:Make`.
fn is_tag_name(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_'))
}

/// Re-encodes with the `image` crate, then writes tags with exiftool.
pub struct ExifToolProcessor {
    exiftool: Arc<Mutex<ExifTool>>,
    output_dir: PathBuf,
}

impl ExifToolProcessor {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, EncodingError> {
        Ok(Self {
            exiftool: Arc::new(Mutex::new(ExifTool::new()?)),
            output_dir: output_dir.into(),
        })
    }

    pub fn with_executable(
        exiftool_path: &Path,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, EncodingError> {
        Ok(Self {
            exiftool: Arc::new(Mutex::new(ExifTool::with_executable(exiftool_path)?)),
            output_dir: output_dir.into(),
        })
    }
}

#[async_trait]
impl ImageProcessor for ExifToolProcessor {
    #[instrument(skip(self, options), fields(tags = options.exif.len()))]
    async fn reencode(
        &self,
        source: &ImageRef,
        transforms: &[Transform],
        options: &EncodeOptions,
    ) -> Result<ImageRef, EncodingError> {
        let source = source.path().to_path_buf();
        let transforms = transforms.to_vec();
        let options = options.clone();
        let output_dir = self.output_dir.clone();
        let exiftool = Arc::clone(&self.exiftool);

        tokio::task::spawn_blocking(move || -> Result<ImageRef, EncodingError> {
            let target = reencode_file(&source, &output_dir, &transforms, &options)?;
            let args = exif_write_args(&options.exif, &target);
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            exiftool
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .execute_lines(&args)?;
            debug!(output = %target.display(), "metadata written");
            Ok(ImageRef::new(target))
        })
        .await?
    }
}

pub fn apply_transforms(mut img: DynamicImage, transforms: &[Transform]) -> DynamicImage {
    for transform in transforms {
        img = match *transform {
            Transform::Rotate90 => img.rotate90(),
            Transform::Rotate180 => img.rotate180(),
            Transform::Rotate270 => img.rotate270(),
            Transform::FlipHorizontal => img.fliph(),
            Transform::FlipVertical => img.flipv(),
            Transform::Resize { width, height } => img.resize_exact(
                width.max(1),
                height.max(1),
                image::imageops::FilterType::Triangle,
            ),
        };
    }
    img
}

/// Maps `compress` in `0.0..=1.0` to a JPEG quality in `1..=100`.
pub fn jpeg_quality(compress: f32) -> Result<u8, EncodingError> {
    if !(0.0..=1.0).contains(&compress) {
        return Err(EncodingError::InvalidCompression(compress));
    }
    Ok(((compress * 100.0).round() as u8).max(1))
}

fn reencode_file(
    source: &Path,
    output_dir: &Path,
    transforms: &[Transform],
    options: &EncodeOptions,
) -> Result<PathBuf, EncodingError> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| EncodingError::InvalidSource(source.display().to_string()))?;
    let target = output_dir.join(format!("{stem}-stamped.{}", options.format.extension()));

    let img = apply_transforms(image::open(source)?, transforms);
    match options.format {
        ImageFormat::Jpeg => {
            let quality = jpeg_quality(options.compress)?;
            let writer = BufWriter::new(File::create(&target)?);
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(writer, quality))?;
        }
        ImageFormat::Png => img.save_with_format(&target, image::ImageFormat::Png)?,
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use image::{GenericImageView, Rgb, RgbImage};
    use serde_json::json;

    fn capture_time() -> CaptureTime {
        let utc = Utc.with_ymd_and_hms(2024, 1, 15, 3, 30, 0).unwrap();
        CaptureTime::at(utc, None)
    }

    #[test]
    fn test_hemisphere_refs() {
        assert_eq!(latitude_ref(-6.2), "S");
        assert_eq!(latitude_ref(0.0), "N");
        assert_eq!(latitude_ref(52.3), "N");
        assert_eq!(longitude_ref(106.8), "E");
        assert_eq!(longitude_ref(0.0), "E");
        assert_eq!(longitude_ref(-74.006), "W");
    }

    #[test]
    fn test_geotag_merges_over_camera_exif() {
        let original = json!({
            "Make": "Pixel",
            "Software": "HDR+ 1.0",
            "GPSLatitude": 1.0
        });
        let original = original.as_object().unwrap();
        let coords = LocationCoords::new(-6.914_744, 107.609_81);

        let exif = geotag_exif(original, &coords, &capture_time(), "GPS-CAM App");

        assert_eq!(exif["Make"], "Pixel");
        assert_eq!(exif["Software"], "GPS-CAM App");
        assert_eq!(exif["GPSLatitude"], json!(-6.914_744));
        assert_eq!(exif["GPSLongitude"], json!(107.609_81));
        assert_eq!(exif["GPSLatitudeRef"], "S");
        assert_eq!(exif["GPSLongitudeRef"], "E");
        assert_eq!(exif["DateTimeOriginal"], "2024-01-15T03:30:00.000Z");
    }

    #[test]
    fn test_write_args_skip_non_scalars_and_target_last() {
        let exif = json!({
            "Make": "Pixel",
            "ISO": 100,
            "Flash": true,
            "Thumbnail": { "width": 10 },
            "Lens": null
        });
        let args = exif_write_args(exif.as_object().unwrap(), Path::new("/tmp/out.jpg"));

        assert!(args.contains(&"-Make=Pixel".to_string()));
        assert!(args.contains(&"-ISO=100".to_string()));
        assert!(args.contains(&"-Flash=1".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("-Thumbnail") || a.starts_with("-Lens")));
        assert!(args.contains(&"-overwrite_original".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.jpg"));
    }

    #[test]
    fn test_write_args_never_span_lines() {
        let exif = json!({
            "ImageDescription": "Site visit\n-execute\n/etc/hosts",
            "UserComment": "line one\r\nline two",
            "ThumbnailImage": "(Binary data 5120 bytes, use -b option to extract)",
            "Bad\nTag": "x",
            "Make": "Pixel"
        });
        let args = exif_write_args(exif.as_object().unwrap(), Path::new("/out/photo-stamped.jpg"));

        assert!(args.iter().all(|a| !a.contains(['\n', '\r'])));
        assert!(!args.iter().any(|a| a.starts_with("-ImageDescription")));
        assert!(!args.iter().any(|a| a.starts_with("-UserComment")));
        assert!(!args.iter().any(|a| a.starts_with("-ThumbnailImage")));
        assert!(!args.iter().any(|a| a == "-execute"));
        assert_eq!(
            args,
            vec![
                "-Make=Pixel",
                "-n",
                "-m",
                "-overwrite_original",
                "/out/photo-stamped.jpg"
            ]
        );
    }

    #[test]
    fn test_jpeg_quality_bounds() {
        assert_eq!(jpeg_quality(1.0).unwrap(), 100);
        assert_eq!(jpeg_quality(0.85).unwrap(), 85);
        assert_eq!(jpeg_quality(0.0).unwrap(), 1);
        assert!(matches!(
            jpeg_quality(1.5),
            Err(EncodingError::InvalidCompression(_))
        ));
    }

    #[test]
    fn test_no_transforms_keeps_geometry() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(40, 30));
        let out = apply_transforms(img, &[]);
        assert_eq!(out.dimensions(), (40, 30));
    }

    #[test]
    fn test_transforms_apply_in_order() {
        let mut raw = RgbImage::new(4, 2);
        raw.put_pixel(0, 0, Rgb([255, 0, 0]));
        let img = DynamicImage::ImageRgb8(raw);

        let out = apply_transforms(
            img,
            &[Transform::Rotate90, Transform::Resize { width: 4, height: 8 }],
        );
        assert_eq!(out.dimensions(), (4, 8));
    }

    #[test]
    fn test_reencode_file_writes_jpeg_next_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        RgbImage::from_pixel(16, 12, Rgb([10, 200, 30]))
            .save(&source)
            .unwrap();

        let options = EncodeOptions {
            compress: 1.0,
            format: ImageFormat::Jpeg,
            exif: Map::new(),
        };
        let target = reencode_file(&source, dir.path(), &[], &options).unwrap();

        assert_eq!(target, dir.path().join("photo-stamped.jpg"));
        let decoded = image::open(&target).unwrap();
        assert_eq!(decoded.dimensions(), (16, 12));
    }
}
