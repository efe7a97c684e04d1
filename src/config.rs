//! Configuration management for the landmark detection pipeline

use crate::constants::{
    DEFAULT_CACHE_WINDOW, DEFAULT_EXPORT_THROTTLE_MS, DEFAULT_OVERLAY_ALPHA, DEFAULT_SEARCH_SCALES, DEFAULT_TICK_MS,
    DEFAULT_WORKER_THREADS, EXTENDED_SEARCH_SCALE, LANDSCAPE_FACE_FRACTION, MAX_COMBINED_UPSCALE, MIN_WORKING_HEIGHT,
    MIN_WORKING_WIDTH, MULTI_FACE_FRACTION, PORTRAIT_FACE_FRACTION, SECONDARY_WORKING_HEIGHT, SECONDARY_WORKING_WIDTH,
    UPSCALED_FACE_FRACTION,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Detector settings, echoed into export metadata
    pub face_mesh: FaceMeshConfig,

    /// Model configuration
    pub models: ModelConfig,

    /// Multi-scale search configuration
    pub search: SearchConfig,

    /// Face size filtering configuration
    pub ranking: RankingConfig,

    /// Overlay rendering configuration
    pub overlay: OverlayConfig,

    /// Playback and worker pool configuration
    pub playback: PlaybackConfig,

    /// Export configuration
    pub export: ExportConfig,
}

/// Face mesh detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceMeshConfig {
    /// Maximum number of faces to keep per frame
    pub max_num_faces: usize,

    /// Whether iris landmarks are requested
    pub refine_landmarks: bool,

    /// Minimum face presence score for a detection (0.0-1.0)
    pub min_detection_confidence: f32,

    /// Minimum score to keep tracking across video frames (0.0-1.0)
    pub min_tracking_confidence: f32,
}

/// Model file paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the face mesh ONNX model
    pub face_landmarks: PathBuf,
}

/// Multi-scale search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Scale factors tried in order
    pub scales: Vec<f64>,

    /// Also try the extended scale after the configured ones
    pub extended_profile: bool,

    /// Sources narrower or shorter than this are upscaled first
    pub min_working_width: u32,
    pub min_working_height: u32,

    /// Sources still below this get a second upscale stage
    pub secondary_working_width: u32,
    pub secondary_working_height: u32,

    /// Ceiling for the combined pre-search upscale
    pub max_upscale: f64,

    /// Retry once with swapped red/blue channels when nothing is found
    pub retry_swapped_channels: bool,
}

/// Minimum face size fractions of the shorter working dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Fraction for portrait rasters
    pub portrait_fraction: f64,

    /// Fraction for landscape rasters that were not upscaled
    pub landscape_fraction: f64,

    /// Fraction for landscape rasters that were upscaled
    pub upscaled_fraction: f64,

    /// Share of the base threshold given up once several faces clear it
    pub multi_face_fraction: f64,
}

/// Overlay appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Weight of the marked copy in the final blend (0.0-1.0)
    pub alpha: f32,

    /// Landmark marker colour, RGB
    pub point_color: [u8; 3],

    /// Connection line colour, RGB
    pub edge_color: [u8; 3],

    /// Landmark marker radius in pixels
    pub point_radius: i32,

    /// Draw mesh contour connections between landmarks
    pub draw_connections: bool,
}

/// Playback scheduler and worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Timer period in milliseconds
    pub tick_ms: u64,

    /// Number of frame processing workers
    pub worker_threads: usize,

    /// Frames kept per stream behind the newest computed frame (0 keeps all)
    pub cache_window: u64,

    /// Start playing as soon as a video is loaded
    pub start_playing: bool,
}

/// Landmark export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving `landmark_data_*.json` files
    pub output_dir: PathBuf,

    /// Export requests within this many milliseconds of the last one are ignored
    pub throttle_ms: u64,

    /// Export automatically after a still image has been processed
    pub auto_export_images: bool,
}

impl Default for FaceMeshConfig {
    fn default() -> Self {
        Self {
            max_num_faces: 5,
            refine_landmarks: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_landmarks: PathBuf::from("assets/face_landmarks.onnx"),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            scales: DEFAULT_SEARCH_SCALES.to_vec(),
            extended_profile: false,
            min_working_width: MIN_WORKING_WIDTH,
            min_working_height: MIN_WORKING_HEIGHT,
            secondary_working_width: SECONDARY_WORKING_WIDTH,
            secondary_working_height: SECONDARY_WORKING_HEIGHT,
            max_upscale: MAX_COMBINED_UPSCALE,
            retry_swapped_channels: true,
        }
    }
}

impl SearchConfig {
    /// Scales to try, in order, including the extended scale when enabled
    #[must_use]
    pub fn effective_scales(&self) -> Vec<f64> {
        let mut scales = self.scales.clone();
        if self.extended_profile && !scales.contains(&EXTENDED_SEARCH_SCALE) {
            scales.push(EXTENDED_SEARCH_SCALE);
        }
        scales
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            portrait_fraction: PORTRAIT_FACE_FRACTION,
            landscape_fraction: LANDSCAPE_FACE_FRACTION,
            upscaled_fraction: UPSCALED_FACE_FRACTION,
            multi_face_fraction: MULTI_FACE_FRACTION,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_OVERLAY_ALPHA,
            point_color: [255, 0, 0],
            edge_color: [0, 0, 255],
            point_radius: 1,
            draw_connections: true,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            worker_threads: DEFAULT_WORKER_THREADS,
            cache_window: DEFAULT_CACHE_WINDOW,
            start_playing: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("landmarks"),
            throttle_ms: DEFAULT_EXPORT_THROTTLE_MS,
            auto_export_images: true,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first out-of-range value
    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.face_mesh.min_detection_confidence) {
            return Err(Error::ConfigError(
                "Minimum detection confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !unit.contains(&self.face_mesh.min_tracking_confidence) {
            return Err(Error::ConfigError(
                "Minimum tracking confidence must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.search.scales.is_empty() {
            return Err(Error::ConfigError("At least one search scale is required".to_string()));
        }
        if self.search.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(Error::ConfigError("Search scales must be positive".to_string()));
        }
        if !self.search.max_upscale.is_finite() || self.search.max_upscale < 1.0 {
            return Err(Error::ConfigError("Maximum upscale must be at least 1.0".to_string()));
        }
        if self.search.min_working_width == 0 || self.search.min_working_height == 0 {
            return Err(Error::ConfigError("Minimum working resolution must be non-zero".to_string()));
        }

        let fractions = [
            self.ranking.portrait_fraction,
            self.ranking.landscape_fraction,
            self.ranking.upscaled_fraction,
            self.ranking.multi_face_fraction,
        ];
        if fractions.iter().any(|f| !(0.0..1.0).contains(f)) {
            return Err(Error::ConfigError(
                "Face size fractions must be in [0.0, 1.0)".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.overlay.alpha) {
            return Err(Error::ConfigError("Overlay alpha must be between 0.0 and 1.0".to_string()));
        }
        if self.overlay.point_radius < 0 {
            return Err(Error::ConfigError("Point radius must not be negative".to_string()));
        }

        if self.playback.tick_ms == 0 {
            return Err(Error::ConfigError("Tick period must be greater than 0".to_string()));
        }
        if self.playback.worker_threads == 0 {
            return Err(Error::ConfigError("Worker pool needs at least one thread".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Landmark detector configuration

# Detector settings (also written into export metadata)
face_mesh:
  max_num_faces: 5
  refine_landmarks: true
  min_detection_confidence: 0.5
  min_tracking_confidence: 0.5

# Model paths
models:
  face_landmarks: "assets/face_landmarks.onnx"

# Multi-scale search for still images
search:
  scales: [0.75, 1.0, 1.25]
  extended_profile: false
  min_working_width: 640
  min_working_height: 480
  secondary_working_width: 1024
  secondary_working_height: 768
  max_upscale: 3.0
  retry_swapped_channels: true

# Minimum face size as a fraction of the shorter side
ranking:
  portrait_fraction: 0.03
  landscape_fraction: 0.06
  upscaled_fraction: 0.04
  # Share of the minimum dropped when several faces qualify
  multi_face_fraction: 0.03

# Overlay drawing
overlay:
  alpha: 0.5
  point_color: [255, 0, 0]
  edge_color: [0, 0, 255]
  point_radius: 1
  draw_connections: true

# Video playback
playback:
  tick_ms: 15
  worker_threads: 5
  cache_window: 300
  start_playing: true

# JSON export
export:
  output_dir: "landmarks"
  throttle_ms: 1000
  auto_export_images: true
"#;
