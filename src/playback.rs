//! Playback session: the owner of the stream handle, the frame cache, the
//! capture buffer and the exporter.
//!
//! A host event loop calls [`Session::tick`] on a fixed timer. Frame
//! advancement is gated so playback never outruns the source's frame rate,
//! and every call reports what happened as a [`PlaybackEvent`].

use crate::capture::{CaptureBuffer, CaptureMode};
use crate::config::Config;
use crate::constants::DEFAULT_FPS;
use crate::detector::DetectorAdapter;
use crate::export::{ExportOutcome, Exporter};
use crate::frame_cache::{CacheStats, FrameCache, StreamId};
use crate::pipeline::{FrameOutput, FramePipeline};
use crate::raster::Raster;
use crate::video_source::{open_source, FrameSource};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No stream loaded
    Idle,
    Playing,
    Paused,
    /// Stream ran out and was released
    Ended,
}

/// What a tick or seek did
#[derive(Debug)]
pub enum PlaybackEvent {
    /// Nothing loaded
    Idle,
    /// Playing, but the next frame is not due yet
    Waiting,
    /// Paused, nothing advanced
    Paused,
    /// A frame was processed and is ready for display
    Frame {
        index: u64,
        output: Arc<FrameOutput>,
    },
    /// The stream ended; carries the final export if there was data
    Ended {
        export: Option<Result<ExportOutcome>>,
    },
    /// The stream failed and was closed
    StreamFailed {
        message: String,
    },
}

/// Result of loading a still image
#[derive(Debug)]
pub struct ImageReport {
    pub output: Arc<FrameOutput>,
    /// Automatic export attempt, if enabled and faces were found
    pub export: Option<Result<ExportOutcome>>,
}

struct ActiveStream {
    id: StreamId,
    source: Box<dyn FrameSource>,
    frame_interval: Duration,
    last_advance: Option<Instant>,
}

impl ActiveStream {
    fn release(mut self, cache: &mut FrameCache) {
        self.source.release();
        cache.forget_stream(self.id);
        log::info!("Released {}", self.id);
    }
}

/// One user session over images and video streams
pub struct Session {
    pipeline: Arc<FramePipeline>,
    cache: FrameCache,
    capture: CaptureBuffer,
    exporter: Exporter,
    state: PlaybackState,
    stream: Option<ActiveStream>,
    image_source: Option<PathBuf>,
    frame_counter: u64,
    displayed: Option<u64>,
    current: Option<Arc<FrameOutput>>,
    tick_period: Duration,
    start_playing: bool,
    auto_export_images: bool,
}

impl Session {
    /// Create a session around a detector
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot be started
    pub fn new(detector: DetectorAdapter, config: &Config) -> Result<Self> {
        let pipeline = Arc::new(FramePipeline::new(detector, config));
        let cache = FrameCache::new(
            Arc::clone(&pipeline),
            config.playback.worker_threads,
            config.playback.cache_window,
        )?;
        log::info!(
            "Session ready: detector {}, {} worker(s)",
            pipeline.detector_name(),
            config.playback.worker_threads
        );

        Ok(Self {
            pipeline,
            cache,
            capture: CaptureBuffer::new(CaptureMode::SingleFrame),
            exporter: Exporter::new(&config.export, config.face_mesh.clone()),
            state: PlaybackState::Idle,
            stream: None,
            image_source: None,
            frame_counter: 0,
            displayed: None,
            current: None,
            tick_period: Duration::from_millis(config.playback.tick_ms),
            start_playing: config.playback.start_playing,
            auto_export_images: config.export.auto_export_images,
        })
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Index of the next frame playback will pull
    #[must_use]
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Last processed frame or image
    #[must_use]
    pub fn current_output(&self) -> Option<&Arc<FrameOutput>> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn capture(&self) -> &CaptureBuffer {
        &self.capture
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    #[must_use]
    pub fn stream_id(&self) -> Option<StreamId> {
        self.stream.as_ref().map(|stream| stream.id)
    }

    /// Path of the still image last loaded, if the session is showing one
    #[must_use]
    pub fn image_source(&self) -> Option<&Path> {
        self.image_source.as_deref()
    }

    pub fn exporter_mut(&mut self) -> &mut Exporter {
        &mut self.exporter
    }

    /// Open a video source by path and load it
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened; the session is
    /// left as it was
    pub fn load_video_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let source = open_source(path, None)?;
        self.load_video(source);
        Ok(())
    }

    /// Replace any loaded stream with `source` and start at frame 0
    pub fn load_video(&mut self, source: Box<dyn FrameSource>) {
        self.release_stream();
        let fps = source.fps().filter(|fps| fps.is_finite() && *fps > 0.0).unwrap_or(DEFAULT_FPS);
        let id = StreamId::next();
        log::info!("Loaded {} as {id} at {fps:.2} fps", source.describe());

        self.stream = Some(ActiveStream {
            id,
            source,
            frame_interval: Duration::from_secs_f64(1.0 / fps),
            last_advance: None,
        });
        self.image_source = None;
        self.frame_counter = 0;
        self.displayed = None;
        self.current = None;
        self.capture.start_stream();
        self.state = if self.start_playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        };
    }

    /// Load and process a still image
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be read; the session is left
    /// as it was
    pub fn load_image<P: AsRef<Path>>(&mut self, path: P) -> Result<ImageReport> {
        let path = path.as_ref();
        let raster = Raster::open(path).map_err(|e| {
            log::error!("Failed to load image {}: {e}", path.display());
            e
        })?;
        let report = self.show_image(&raster)?;
        self.image_source = Some(path.to_path_buf());
        Ok(report)
    }

    /// Process an already decoded still image
    ///
    /// # Errors
    ///
    /// Returns an error if the raster is empty; the session is left as it was
    pub fn show_image(&mut self, raster: &Raster) -> Result<ImageReport> {
        let output = Arc::new(self.pipeline.process_image(raster)?);

        self.release_stream();
        self.state = PlaybackState::Idle;
        self.frame_counter = 0;
        self.displayed = None;
        self.image_source = None;
        self.capture.record_frame(None, &output.records);
        self.current = Some(Arc::clone(&output));

        let export = (self.auto_export_images && !output.records.is_empty()).then(|| self.export());
        Ok(ImageReport { output, export })
    }

    /// Flip between playing and paused; other states are unchanged
    pub fn toggle(&mut self) -> PlaybackState {
        self.state = match self.state {
            PlaybackState::Playing => PlaybackState::Paused,
            PlaybackState::Paused => PlaybackState::Playing,
            other => other,
        };
        log::debug!("Playback state: {:?}", self.state);
        self.state
    }

    /// Timer callback: advance one frame if playing and the frame is due
    pub fn tick(&mut self, now: Instant) -> PlaybackEvent {
        match self.state {
            PlaybackState::Idle | PlaybackState::Ended => PlaybackEvent::Idle,
            PlaybackState::Paused => PlaybackEvent::Paused,
            PlaybackState::Playing => {
                let gate = match &self.stream {
                    Some(stream) => stream.frame_interval.max(self.tick_period),
                    None => return PlaybackEvent::Idle,
                };
                let due = self
                    .stream
                    .as_ref()
                    .and_then(|stream| stream.last_advance)
                    .map_or(true, |last| now.saturating_duration_since(last) >= gate);
                if due {
                    self.pull(now, false)
                } else {
                    PlaybackEvent::Waiting
                }
            }
        }
    }

    /// Step `delta` frames from the displayed one and process that frame,
    /// whether playing or paused. Play state is not changed.
    pub fn seek(&mut self, delta: i64, now: Instant) -> PlaybackEvent {
        let Some(stream) = self.stream.as_mut() else {
            return PlaybackEvent::Idle;
        };

        let base = self.displayed.map_or(-1, |index| i64::try_from(index).unwrap_or(i64::MAX));
        let mut target = u64::try_from(base.saturating_add(delta).max(0)).unwrap_or(0);
        if let Some(count) = stream.source.frame_count() {
            target = target.min(count.saturating_sub(1));
        }

        if let Err(e) = stream.source.seek(target) {
            return self.fail_stream(&e.to_string());
        }
        self.frame_counter = target;
        log::debug!("Seek to frame {target}");

        self.pull(now, true)
    }

    /// Turn real-time capture on or off
    pub fn set_realtime_capture(&mut self, enabled: bool) {
        let mode = if enabled {
            CaptureMode::RealTime
        } else {
            CaptureMode::SingleFrame
        };
        self.capture.set_mode(mode);
    }

    /// Export the captured landmarks, subject to the throttle
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written; captured data is kept
    pub fn export(&mut self) -> Result<ExportOutcome> {
        self.exporter.export(&mut self.capture)
    }

    /// Export as of `now`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written; captured data is kept
    pub fn export_at(&mut self, now: Instant) -> Result<ExportOutcome> {
        self.exporter.export_at(&mut self.capture, now)
    }

    /// Close any stream and go idle
    pub fn close(&mut self) {
        self.release_stream();
        self.state = PlaybackState::Idle;
        self.frame_counter = 0;
        self.displayed = None;
    }

    /// Read and process the frame at `frame_counter`. Running out of frames
    /// ends the stream, except while seeking.
    fn pull(&mut self, now: Instant, seeking: bool) -> PlaybackEvent {
        let Some(stream) = self.stream.as_mut() else {
            return PlaybackEvent::Idle;
        };
        match stream.source.read() {
            Ok(Some(raster)) => {
                let index = self.frame_counter;
                let output = self.cache.process(stream.id, index, &raster);
                stream.last_advance = Some(now);
                self.frame_counter = index + 1;
                self.displayed = Some(index);
                self.capture.record_frame(Some(index), &output.records);
                self.current = Some(Arc::clone(&output));
                PlaybackEvent::Frame { index, output }
            }
            Ok(None) if seeking => {
                log::debug!("Seek past the last frame ignored");
                PlaybackEvent::Waiting
            }
            Ok(None) => self.finish_stream(),
            Err(e) => self.fail_stream(&e.to_string()),
        }
    }

    fn finish_stream(&mut self) -> PlaybackEvent {
        log::info!("End of stream after {} frame(s)", self.frame_counter);
        self.release_stream();
        self.state = PlaybackState::Ended;
        let export = (!self.capture.is_empty()).then(|| self.export());
        self.frame_counter = 0;
        PlaybackEvent::Ended { export }
    }

    fn fail_stream(&mut self, message: &str) -> PlaybackEvent {
        log::error!("Video stream failed: {message}");
        self.release_stream();
        self.current = None;
        self.displayed = None;
        self.frame_counter = 0;
        self.state = PlaybackState::Idle;
        PlaybackEvent::StreamFailed {
            message: message.to_string(),
        }
    }

    fn release_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.release(&mut self.cache);
        }
    }
}
