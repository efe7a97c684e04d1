//! Facial landmark detection, overlay and export for still images and video.
//!
//! The pipeline wraps an opaque landmark detector and adds everything around it:
//! - Multi-scale search with working-resolution upscaling for still images
//! - Size-based ranking and filtering of detected faces
//! - Exact remapping of landmarks to original image pixels
//! - Alpha-blended overlay rendering
//! - A memoizing worker pool for video frames and a paced playback session
//! - Throttled JSON export of captured landmarks
//!
//! # Examples
//!
//! ## Processing an image
//!
//! ```no_run
//! use landetect::{config::Config, detector::{DetectorAdapter, FaceCandidate, LandmarkDetector},
//!                 pipeline::FramePipeline, raster::Raster};
//! use image::RgbImage;
//!
//! struct NoFaces;
//!
//! impl LandmarkDetector for NoFaces {
//!     fn detect(&self, _image: &RgbImage) -> landetect::Result<Vec<FaceCandidate>> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = FramePipeline::new(DetectorAdapter::new(NoFaces), &Config::default());
//! let raster = Raster::open("portrait.jpg")?;
//! let output = pipeline.process_image(&raster)?;
//! for face in &output.records {
//!     println!("face {} has {} landmarks", face.face_index, face.landmarks.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Playing back a frame sequence
//!
//! ```no_run
//! use landetect::{config::Config, detector::DetectorAdapter, playback::{PlaybackEvent, Session}};
//! # use landetect::detector::{FaceCandidate, LandmarkDetector};
//! # struct NoFaces;
//! # impl LandmarkDetector for NoFaces {
//! #     fn detect(&self, _image: &image::RgbImage) -> landetect::Result<Vec<FaceCandidate>> { Ok(Vec::new()) }
//! # }
//! use std::time::Instant;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new(DetectorAdapter::new(NoFaces), &Config::default())?;
//! session.set_realtime_capture(true);
//! session.load_video_path("frames/")?;
//! loop {
//!     match session.tick(Instant::now()) {
//!         PlaybackEvent::Frame { index, output } => println!("frame {index}: {} face(s)", output.face_count()),
//!         PlaybackEvent::Ended { .. } | PlaybackEvent::StreamFailed { .. } | PlaybackEvent::Idle => break,
//!         _ => std::thread::sleep(std::time::Duration::from_millis(15)),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

/// Pixel buffers with a known channel order
pub mod raster;

/// Detector adapter and landmark types
pub mod detector;

/// ONNX Runtime face mesh backend
#[cfg(feature = "onnx")]
pub mod mark_detection;

/// Multi-scale search for still images
pub mod scale_search;

/// Face ranking and minimum-size filtering
pub mod face_ranking;

/// Scale chains and remapping to original pixels
pub mod coordinate_mapping;

/// Face mesh contour connections
pub mod mesh_connections;

/// Overlay rendering
pub mod overlay;

/// Per-frame processing pipeline
pub mod pipeline;

/// Memoized frame processing on a worker pool
pub mod frame_cache;

/// Video frame sources
pub mod video_source;

/// Landmark accumulation buffer
pub mod capture;

/// JSON export
pub mod export;

/// Playback session and scheduler
pub mod playback;

/// Headless application
pub mod app;

/// Utility functions for image processing and numeric conversion
pub mod utils;

pub use error::{Error, Result};
