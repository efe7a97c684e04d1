//! Headless application: drives a [`Session`] over one image or video and
//! writes the results to disk.

use crate::{
    config::Config,
    detector::DetectorAdapter,
    error::{Error, Result},
    export::ExportOutcome,
    pipeline::FrameOutput,
    playback::{PlaybackEvent, Session},
};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// What to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A still image file
    Image(PathBuf),
    /// A frame directory or animated GIF
    Video(PathBuf),
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Image or video to process
    pub input: InputSource,
    /// Accumulate every frame instead of only the latest
    pub realtime: bool,
    /// Write processed frames as PNG into this directory
    pub save_frames: Option<PathBuf>,
    /// Pipeline, playback and export settings
    pub settings: Config,
}

/// Totals reported after a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames processed (1 for an image)
    pub frames: u64,
    /// Face records produced over all frames
    pub faces: usize,
    /// Export files written
    pub exports: Vec<PathBuf>,
}

/// Main application struct
pub struct LandmarkApp {
    config: AppConfig,
    session: Session,
}

impl LandmarkApp {
    /// Create the application around a detector
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the worker pool
    /// cannot be started
    pub fn new(config: AppConfig, detector: DetectorAdapter) -> Result<Self> {
        info!("Initializing landmark detection application");
        config.settings.validate()?;
        let session = Session::new(detector, &config.settings)?;
        Ok(Self { config, session })
    }

    /// The session driven by this application
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Process the configured input to completion
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be opened, the stream fails,
    /// or a frame or export cannot be written
    pub fn run(&mut self) -> Result<RunSummary> {
        self.session.set_realtime_capture(self.config.realtime);
        match self.config.input.clone() {
            InputSource::Image(path) => self.run_image(&path),
            InputSource::Video(path) => self.run_video(&path),
        }
    }

    fn run_image(&mut self, path: &Path) -> Result<RunSummary> {
        info!("Processing image: {}", path.display());
        let report = self.session.load_image(path)?;
        self.save_frame(0, &report.output)?;

        let mut summary = RunSummary {
            frames: 1,
            faces: report.output.face_count(),
            exports: Vec::new(),
        };
        if report.output.records.is_empty() {
            warn!("No faces detected in {}", path.display());
        }
        if let Some(export) = report.export {
            collect_export(&mut summary, export)?;
        }
        Ok(summary)
    }

    fn run_video(&mut self, path: &Path) -> Result<RunSummary> {
        info!("Processing video: {}", path.display());
        self.session.load_video_path(path)?;

        let tick = Duration::from_millis(self.config.settings.playback.tick_ms);
        let start_time = Instant::now();
        let mut summary = RunSummary::default();

        loop {
            match self.session.tick(Instant::now()) {
                PlaybackEvent::Frame { index, output } => {
                    summary.frames += 1;
                    summary.faces += output.face_count();
                    self.save_frame(index, &output)?;
                }
                PlaybackEvent::Waiting => std::thread::sleep(tick),
                PlaybackEvent::Paused => {
                    self.session.toggle();
                }
                PlaybackEvent::Ended { export } => {
                    if let Some(export) = export {
                        collect_export(&mut summary, export)?;
                    }
                    break;
                }
                PlaybackEvent::StreamFailed { message } => return Err(Error::Stream(message)),
                PlaybackEvent::Idle => break,
            }
        }

        let elapsed = start_time.elapsed().as_secs_f64();
        let stats = self.session.cache_stats();
        info!(
            "Processed {} frame(s) in {:.2}s, {} face record(s), {} computed, {} cache hit(s)",
            summary.frames, elapsed, summary.faces, stats.computations, stats.hits
        );
        Ok(summary)
    }

    fn save_frame(&self, index: u64, output: &FrameOutput) -> Result<()> {
        let Some(dir) = &self.config.save_frames else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("frame_{index:06}.png"));
        output.display.save(&path)?;
        log::debug!("Saved {}", path.display());
        Ok(())
    }
}

fn collect_export(summary: &mut RunSummary, export: Result<ExportOutcome>) -> Result<()> {
    match export? {
        ExportOutcome::Written(path) => {
            info!("Landmarks written to {}", path.display());
            summary.exports.push(path);
        }
        ExportOutcome::Throttled => warn!("Export skipped, requested too soon after the previous one"),
        ExportOutcome::Empty => info!("No landmarks to export"),
    }
    Ok(())
}
