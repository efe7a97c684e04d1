//! Landmark accumulation between exports.

use crate::coordinate_mapping::FaceRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How processed frames feed the buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    /// Only the most recent frame is kept
    #[default]
    SingleFrame,
    /// Every processed frame is appended
    RealTime,
}

impl CaptureMode {
    /// Tag written into export metadata
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleFrame => "single-frame",
            Self::RealTime => "real-time",
        }
    }
}

/// Face records waiting to be exported
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    mode: CaptureMode,
    records: Vec<FaceRecord>,
    last_frame: Option<u64>,
}

impl CaptureBuffer {
    /// Empty buffer in the given mode
    #[must_use]
    pub fn new(mode: CaptureMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Switch modes. Entering real-time capture starts from an empty buffer.
    pub fn set_mode(&mut self, mode: CaptureMode) {
        if mode == self.mode {
            return;
        }
        if mode == CaptureMode::RealTime {
            self.clear();
        }
        self.mode = mode;
        log::info!("Capture mode set to {}", mode.as_str());
    }

    /// Feed the records of one processed frame.
    ///
    /// In single-frame mode a frame without faces leaves the buffer alone,
    /// so the most recent detection survives faceless frames. In real-time
    /// mode a frame at or before the last captured index is ignored, so
    /// revisiting frames never duplicates data or breaks order.
    pub fn record_frame(&mut self, frame: Option<u64>, records: &[FaceRecord]) {
        match self.mode {
            CaptureMode::SingleFrame => {
                if records.is_empty() {
                    return;
                }
                self.records = records.to_vec();
                self.last_frame = frame;
            }
            CaptureMode::RealTime => {
                if let (Some(index), Some(last)) = (frame, self.last_frame) {
                    if index <= last {
                        log::debug!("Frame {index} already captured, skipping");
                        return;
                    }
                }
                self.records.extend_from_slice(records);
                if frame.is_some() {
                    self.last_frame = frame;
                }
            }
        }
    }

    /// Forget the last captured index, e.g. when a new stream starts at frame 0
    pub fn start_stream(&mut self) {
        self.last_frame = None;
    }

    /// Drop all records
    pub fn clear(&mut self) {
        self.records.clear();
        self.last_frame = None;
    }

    /// Buffered records in capture order
    #[must_use]
    pub fn records(&self) -> &[FaceRecord] {
        &self.records
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct frames with at least one face; still images count as frame 0
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.records
            .iter()
            .map(|record| record.frame.unwrap_or(0))
            .collect::<BTreeSet<_>>()
            .len()
    }
}
