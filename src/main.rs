//! Facial landmark detection for still images and frame sequences.

use anyhow::{Context, Result};
use clap::Parser;
use landetect::app::{AppConfig, InputSource, LandmarkApp};
use landetect::config::Config;
use landetect::detector::DetectorAdapter;
use landetect::mark_detection::OnnxFaceMeshDetector;
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Still image to process
    #[arg(short, long, conflicts_with = "video", required_unless_present = "video")]
    image: Option<PathBuf>,

    /// Frame directory or animated GIF to play back
    #[arg(short, long)]
    video: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Accumulate landmarks from every frame
    #[arg(short, long)]
    realtime: bool,

    /// Directory for exported landmark files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write processed frames as PNG into this directory
    #[arg(long)]
    save_frames: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Facial landmark detection");

    // Load configuration if provided
    let mut settings = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };
    if let Some(dir) = args.output_dir {
        settings.export.output_dir = dir;
    }

    let input = match (args.image, args.video) {
        (Some(image), _) => InputSource::Image(image),
        (None, Some(video)) => InputSource::Video(video),
        (None, None) => anyhow::bail!("Either --image or --video is required"),
    };

    let detector = OnnxFaceMeshDetector::new(&settings.models.face_landmarks, &settings.face_mesh)
        .with_context(|| format!("loading {}", settings.models.face_landmarks.display()))?;

    let config = AppConfig {
        input,
        realtime: args.realtime,
        save_frames: args.save_frames,
        settings,
    };

    // Create and run application
    let mut app = LandmarkApp::new(config, DetectorAdapter::new(detector))?;
    let summary = app.run()?;
    info!(
        "Done: {} frame(s), {} face record(s), {} export file(s)",
        summary.frames,
        summary.faces,
        summary.exports.len()
    );

    Ok(())
}
