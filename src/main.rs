use async_trait::async_trait;
use clap::Parser;
use exiftool::ExifTool;
use gps_cam::capabilities::desktop::{FixedLocation, StillFileCamera};
use gps_cam::capabilities::exif::ExifToolProcessor;
use gps_cam::capabilities::weather::OpenWeatherClient;
use gps_cam::capabilities::{GeoPoint, WeatherError, WeatherInfo, WeatherProvider};
use gps_cam::preview::render_preview_file;
use gps_cam::{CaptureConfig, CaptureOrchestrator, LocationCoords, ScreenState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Stamp a photo with location, time and weather.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Image the still camera captures.
    photo: PathBuf,

    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Report the location as coming from a mock provider.
    #[arg(long)]
    mocked: bool,

    /// Capture with the front camera.
    #[arg(long)]
    front: bool,

    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Watermark image for the composited preview.
    #[arg(long)]
    watermark: Option<PathBuf>,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the exiftool executable, looked up on PATH otherwise.
    #[arg(long)]
    exiftool: Option<PathBuf>,
}

/// Stands in when no API key is configured, so every lookup fails softly.
struct Unconfigured;

#[async_trait]
impl WeatherProvider for Unconfigured {
    async fn current_weather(&self, _at: GeoPoint) -> Result<WeatherInfo, WeatherError> {
        Err(WeatherError::MissingApiKey)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG controls the level, e.g. RUST_LOG=gps_cam=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CaptureConfig::from_json_file(path)?,
        None => CaptureConfig::default().with_env_overrides(),
    };
    std::fs::create_dir_all(&cli.output)?;

    let (camera_exiftool, processor) = match &cli.exiftool {
        Some(path) => (
            ExifTool::with_executable(path)?,
            ExifToolProcessor::with_executable(path, &cli.output)?,
        ),
        None => (ExifTool::new()?, ExifToolProcessor::new(&cli.output)?),
    };
    let camera = StillFileCamera::new(&cli.photo, &cli.output).with_exiftool(camera_exiftool);
    let location =
        FixedLocation::new(LocationCoords::new(cli.lat, cli.lon)).mocked(cli.mocked);
    let weather: Arc<dyn WeatherProvider> = match OpenWeatherClient::from_config(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!(error = %e, "weather disabled");
            Arc::new(Unconfigured)
        }
    };

    let orchestrator = CaptureOrchestrator::builder()
        .camera(Arc::new(camera))
        .location(Arc::new(location))
        .weather(weather)
        .processor(Arc::new(processor))
        .config(config)
        .build();

    orchestrator.mount().await;
    if cli.front {
        orchestrator.toggle_camera_facing().await;
    }

    if orchestrator.snapshot().await.screen == ScreenState::LivePreview {
        let image = orchestrator.capture().await?;
        info!(%image, "stamped photo written");

        if let Some(watermark) = &cli.watermark {
            let output = cli.output.join("preview.jpg");
            let style = orchestrator.config().watermark;
            let written = render_preview_file(&image, watermark, style, &output).await?;
            info!(preview = %written.display(), "preview written");
        }
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&orchestrator.snapshot().await)?
    );

    Ok(())
}
