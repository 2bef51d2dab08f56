use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location permission request failed: {0}")]
    PermissionRequest(String),

    #[error("Location services are disabled")]
    ServicesDisabled,

    #[error("No position fix available: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("No weather API key configured")]
    MissingApiKey,

    #[error("Invalid weather endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Weather request failed: {0}")]
    Network(String),

    #[error("Weather service answered with HTTP {0}")]
    Status(u16),

    #[error("Malformed weather payload: missing {0}")]
    Malformed(&'static str),

    #[error("Weather worker task failed")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Exiftool failed to write metadata")]
    Exiftool(#[from] exiftool::ExifToolError),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid compression factor {0}, expected 0.0..=1.0")]
    InvalidCompression(f32),

    #[error("Source image has no file name: {0}")]
    InvalidSource(String),

    #[error("Encoding worker task failed")]
    Worker(#[from] tokio::task::JoinError),
}
