//! JSON export of captured landmarks.

use crate::capture::{CaptureBuffer, CaptureMode};
use crate::config::{ExportConfig, FaceMeshConfig};
use crate::coordinate_mapping::FaceRecord;
use crate::{Error, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Top-level export document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub metadata: ExportMetadata,
    pub frames: Vec<FrameEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// ISO-8601 local time of the export
    pub timestamp: String,
    /// Distinct frames with at least one face
    pub total_frames: usize,
    pub capture_mode: CaptureMode,
    pub face_mesh_config: FaceMeshConfig,
}

/// One face on one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEntry {
    pub frame: u64,
    pub face_index: usize,
    pub landmarks: Vec<LandmarkEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkEntry {
    pub id: u32,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<&FaceRecord> for FrameEntry {
    fn from(record: &FaceRecord) -> Self {
        Self {
            frame: record.frame.unwrap_or(0),
            face_index: record.face_index,
            landmarks: record
                .landmarks
                .iter()
                .map(|landmark| LandmarkEntry {
                    id: landmark.id,
                    position: Position {
                        x: landmark.x,
                        y: landmark.y,
                        z: landmark.z.unwrap_or(0.0),
                    },
                })
                .collect(),
        }
    }
}

impl ExportBundle {
    /// Snapshot the buffer into an export document
    #[must_use]
    pub fn from_buffer(buffer: &CaptureBuffer, face_mesh: &FaceMeshConfig, timestamp: DateTime<Local>) -> Self {
        Self {
            metadata: ExportMetadata {
                timestamp: timestamp.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
                total_frames: buffer.total_frames(),
                capture_mode: buffer.mode(),
                face_mesh_config: face_mesh.clone(),
            },
            frames: buffer.records().iter().map(FrameEntry::from).collect(),
        }
    }

    /// Pretty-printed JSON with two-space indentation
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `landmark_data_YYYYmmdd_HHMMSS_mmm.json`
#[must_use]
pub fn export_file_name(timestamp: DateTime<Local>) -> String {
    format!("landmark_data_{}.json", timestamp.format("%Y%m%d_%H%M%S_%3f"))
}

/// Result of an export request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// File written at this path
    Written(PathBuf),
    /// Ignored, too soon after the previous request
    Throttled,
    /// Nothing captured, no file written
    Empty,
}

/// Writes export bundles and enforces the cooldown between requests
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
    cooldown: Duration,
    face_mesh: FaceMeshConfig,
    last_request: Option<Instant>,
}

impl Exporter {
    #[must_use]
    pub fn new(config: &ExportConfig, face_mesh: FaceMeshConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            cooldown: Duration::from_millis(config.throttle_ms),
            face_mesh,
            last_request: None,
        }
    }

    /// Directory receiving export files
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Change the directory receiving export files
    pub fn set_output_dir<P: Into<PathBuf>>(&mut self, dir: P) {
        self.output_dir = dir.into();
    }

    /// Export now
    ///
    /// # Errors
    ///
    /// See [`Exporter::export_at`]
    pub fn export(&mut self, buffer: &mut CaptureBuffer) -> Result<ExportOutcome> {
        self.export_at(buffer, Instant::now())
    }

    /// Export the buffer as of `now`.
    ///
    /// Requests within the cooldown of the previous accepted request are
    /// ignored. A successful real-time export clears the buffer; a failed
    /// one leaves it untouched so it can be retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written
    pub fn export_at(&mut self, buffer: &mut CaptureBuffer, now: Instant) -> Result<ExportOutcome> {
        if let Some(last) = self.last_request {
            if now.saturating_duration_since(last) < self.cooldown {
                log::debug!("Export request ignored, last one was {:?} ago", now.saturating_duration_since(last));
                return Ok(ExportOutcome::Throttled);
            }
        }
        self.last_request = Some(now);

        if buffer.is_empty() {
            log::info!("No landmark data to export");
            return Ok(ExportOutcome::Empty);
        }

        let timestamp = Local::now();
        let bundle = ExportBundle::from_buffer(buffer, &self.face_mesh, timestamp);
        let path = self.output_dir.join(export_file_name(timestamp));
        self.write(&bundle, &path).map_err(|e| {
            log::error!("Failed to export landmarks to {}: {e}", path.display());
            e
        })?;

        log::info!(
            "Exported {} face record(s) from {} frame(s) to {}",
            bundle.frames.len(),
            bundle.metadata.total_frames,
            path.display()
        );
        if buffer.mode() == CaptureMode::RealTime {
            buffer.clear();
        }
        Ok(ExportOutcome::Written(path))
    }

    fn write(&self, bundle: &ExportBundle, path: &Path) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            Error::Export(format!("Cannot create {}: {e}", self.output_dir.display()))
        })?;
        let json = bundle.to_json()?;
        std::fs::write(path, json).map_err(|e| Error::Export(format!("Cannot write {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate_mapping::LandmarkRecord;
    use chrono::TimeZone;

    fn record(frame: Option<u64>, z: Option<f64>) -> FaceRecord {
        FaceRecord {
            face_index: 0,
            frame,
            landmarks: vec![LandmarkRecord {
                id: 3,
                x: 12.5,
                y: 7.25,
                z,
            }],
        }
    }

    fn exporter(dir: &Path, throttle_ms: u64) -> Exporter {
        let config = ExportConfig {
            output_dir: dir.to_path_buf(),
            throttle_ms,
            auto_export_images: true,
        };
        Exporter::new(&config, FaceMeshConfig::default())
    }

    #[test]
    fn test_bundle_layout() {
        let mut buffer = CaptureBuffer::new(CaptureMode::SingleFrame);
        buffer.record_frame(None, &[record(None, None)]);
        let timestamp = Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        let bundle = ExportBundle::from_buffer(&buffer, &FaceMeshConfig::default(), timestamp);
        let value: serde_json::Value = serde_json::from_str(&bundle.to_json().unwrap()).unwrap();

        assert_eq!(value["metadata"]["timestamp"], "2024-03-01T12:30:05.000000");
        assert_eq!(value["metadata"]["total_frames"], 1);
        assert_eq!(value["metadata"]["capture_mode"], "single-frame");
        assert_eq!(value["metadata"]["face_mesh_config"]["max_num_faces"], 5);
        assert_eq!(value["metadata"]["face_mesh_config"]["refine_landmarks"], true);
        assert_eq!(value["frames"][0]["frame"], 0);
        assert_eq!(value["frames"][0]["landmarks"][0]["id"], 3);
        assert_eq!(value["frames"][0]["landmarks"][0]["position"]["x"], 12.5);
        assert_eq!(value["frames"][0]["landmarks"][0]["position"]["z"], 0.0);
    }

    #[test]
    fn test_two_space_indent() {
        let bundle = ExportBundle::from_buffer(&CaptureBuffer::default(), &FaceMeshConfig::default(), Local::now());
        let json = bundle.to_json().unwrap();
        assert!(json.contains("\n  \"metadata\": {\n    \"timestamp\""));
    }

    #[test]
    fn test_file_name() {
        let timestamp = Local.with_ymd_and_hms(2024, 3, 1, 8, 5, 9).unwrap();
        assert_eq!(export_file_name(timestamp), "landmark_data_20240301_080509_000.json");
    }

    #[test]
    fn test_empty_buffer_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = exporter(dir.path(), 0);
        let outcome = exporter.export(&mut CaptureBuffer::default()).unwrap();
        assert_eq!(outcome, ExportOutcome::Empty);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_throttle_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = exporter(dir.path(), 1000);
        let mut buffer = CaptureBuffer::default();
        buffer.record_frame(None, &[record(None, Some(0.1))]);

        let start = Instant::now();
        assert!(matches!(exporter.export_at(&mut buffer, start).unwrap(), ExportOutcome::Written(_)));
        let soon = start + Duration::from_millis(400);
        assert_eq!(exporter.export_at(&mut buffer, soon).unwrap(), ExportOutcome::Throttled);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        // Throttled requests do not extend the window
        let later = start + Duration::from_millis(1001);
        assert!(matches!(exporter.export_at(&mut buffer, later).unwrap(), ExportOutcome::Written(_)));
    }

    #[test]
    fn test_realtime_export_clears_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = exporter(dir.path(), 0);
        let mut buffer = CaptureBuffer::new(CaptureMode::RealTime);
        buffer.record_frame(Some(0), &[record(Some(0), None)]);
        exporter.export(&mut buffer).unwrap();
        assert!(buffer.is_empty());

        let mut single = CaptureBuffer::new(CaptureMode::SingleFrame);
        single.record_frame(Some(0), &[record(Some(0), None)]);
        let start = Instant::now() + Duration::from_millis(5);
        exporter.export_at(&mut single, start).unwrap();
        assert!(!single.is_empty());
    }

    #[test]
    fn test_write_failure_preserves_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"a file, not a directory").unwrap();
        let mut exporter = exporter(&blocker, 0);
        let mut buffer = CaptureBuffer::new(CaptureMode::RealTime);
        buffer.record_frame(Some(0), &[record(Some(0), None)]);

        assert!(matches!(exporter.export(&mut buffer), Err(Error::Export(_))));
        assert_eq!(buffer.records().len(), 1);
    }
}
