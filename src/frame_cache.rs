//! Memoized per-frame processing on a bounded worker pool.
//!
//! Results are keyed by `(StreamId, frame index)`. The first request for a
//! key runs the pipeline on the pool; later requests for the same key return
//! the stored result. Stored entries are never modified, only dropped when
//! they fall out of the retention window or their stream is forgotten.

use crate::pipeline::{FramePipeline, FrameOutput};
use crate::raster::Raster;
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one opened video source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u64);

impl StreamId {
    /// Allocate an identity no other stream in this process has used
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// Counters for cache behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from a stored result
    pub hits: u64,
    /// Pipeline runs submitted to the pool
    pub computations: u64,
    /// Entries dropped by the retention window
    pub evictions: u64,
}

type FrameKey = (StreamId, u64);

/// Frame processing cache backed by a rayon thread pool
pub struct FrameCache {
    pipeline: Arc<FramePipeline>,
    pool: rayon::ThreadPool,
    ready: HashMap<FrameKey, Arc<FrameOutput>>,
    newest: HashMap<StreamId, u64>,
    window: u64,
    stats: CacheStats,
}

impl fmt::Debug for FrameCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameCache")
            .field("workers", &self.pool.current_num_threads())
            .field("ready", &self.ready.len())
            .field("window", &self.window)
            .field("stats", &self.stats)
            .finish()
    }
}

impl FrameCache {
    /// Create a cache with `workers` threads keeping `window` frames per stream
    /// behind the newest one (0 keeps everything).
    ///
    /// # Errors
    ///
    /// Returns an error if the thread pool cannot be built
    pub fn new(pipeline: Arc<FramePipeline>, workers: usize, window: u64) -> Result<Self> {
        if workers == 0 {
            return Err(Error::WorkerPool("Worker pool needs at least one thread".to_string()));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("frame-worker-{i}"))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;
        log::debug!("Frame worker pool started with {workers} threads");

        Ok(Self {
            pipeline,
            pool,
            ready: HashMap::new(),
            newest: HashMap::new(),
            window,
            stats: CacheStats::default(),
        })
    }

    /// Processed output for a frame, computing it on the pool if needed.
    ///
    /// Blocks until the result is available. A worker that panics yields the
    /// unmodified frame with no records.
    pub fn process(&mut self, stream: StreamId, index: u64, frame: &Raster) -> Arc<FrameOutput> {
        let key = (stream, index);
        if let Some(output) = self.ready.get(&key) {
            self.stats.hits += 1;
            log::debug!("{stream} frame {index}: cache hit");
            return Arc::clone(output);
        }

        let receiver = self.submit(key, frame.clone());
        let output = receiver.recv().unwrap_or_else(|_| {
            log::error!("{stream} frame {index}: worker dropped its result");
            FrameOutput::unmodified(frame)
        });

        let output = Arc::new(output);
        self.ready.insert(key, Arc::clone(&output));
        self.advance_newest(stream, index);
        output
    }

    /// True if a finished result is stored for the frame
    #[must_use]
    pub fn contains(&self, stream: StreamId, index: u64) -> bool {
        self.ready.contains_key(&(stream, index))
    }

    /// Drop every stored result of a stream
    pub fn forget_stream(&mut self, stream: StreamId) {
        let before = self.ready.len();
        self.ready.retain(|(id, _), _| *id != stream);
        self.newest.remove(&stream);
        let dropped = before - self.ready.len();
        if dropped > 0 {
            log::debug!("Forgot {dropped} cached frame(s) of {stream}");
        }
    }

    /// Number of stored results
    #[must_use]
    pub fn len(&self) -> usize {
        self.ready.len()
    }

    /// True if no results are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Cache counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn submit(&mut self, key: FrameKey, frame: Raster) -> Receiver<FrameOutput> {
        let (sender, receiver) = mpsc::channel();
        let pipeline = Arc::clone(&self.pipeline);
        let (stream, index) = key;
        self.stats.computations += 1;

        self.pool.spawn(move || {
            let output = panic::catch_unwind(AssertUnwindSafe(|| pipeline.process_frame(&frame, index)))
                .unwrap_or_else(|_| {
                    log::error!("{stream} frame {index}: worker panicked, passing frame through");
                    FrameOutput::unmodified(&frame)
                });
            if sender.send(output).is_err() {
                log::debug!("{stream} frame {index}: result no longer wanted");
            }
        });
        receiver
    }

    fn advance_newest(&mut self, stream: StreamId, index: u64) {
        let newest = self.newest.entry(stream).or_insert(index);
        if index > *newest {
            *newest = index;
        }
        let newest = *newest;
        if self.window == 0 || newest <= self.window {
            return;
        }

        let oldest_kept = newest - self.window;
        let before = self.ready.len();
        self.ready
            .retain(|(id, frame), _| *id != stream || *frame >= oldest_kept);
        let evicted = before - self.ready.len();
        if evicted > 0 {
            self.stats.evictions += evicted as u64;
            log::debug!("Evicted {evicted} frame(s) of {stream} older than {oldest_kept}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::detector::{DetectorAdapter, FaceCandidate, LandmarkDetector};
    use image::RgbImage;

    struct PanickingDetector;

    impl LandmarkDetector for PanickingDetector {
        fn detect(&self, _image: &RgbImage) -> Result<Vec<FaceCandidate>> {
            panic!("detector bug");
        }
    }

    struct EmptyDetector;

    impl LandmarkDetector for EmptyDetector {
        fn detect(&self, _image: &RgbImage) -> Result<Vec<FaceCandidate>> {
            Ok(Vec::new())
        }
    }

    fn cache<D: LandmarkDetector + 'static>(detector: D, window: u64) -> FrameCache {
        let pipeline = FramePipeline::new(DetectorAdapter::new(detector), &Config::default());
        FrameCache::new(Arc::new(pipeline), 2, window).unwrap()
    }

    #[test]
    fn test_stream_ids_are_unique() {
        let a = StreamId::next();
        let b = StreamId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let pipeline = FramePipeline::new(DetectorAdapter::new(EmptyDetector), &Config::default());
        assert!(FrameCache::new(Arc::new(pipeline), 0, 0).is_err());
    }

    #[test]
    fn test_worker_panic_passes_frame_through() {
        let mut cache = cache(PanickingDetector, 0);
        let frame = Raster::from_rgb(RgbImage::new(8, 8));
        let output = cache.process(StreamId::next(), 0, &frame);
        assert!(output.records.is_empty());
        assert_eq!(output.display.dimensions(), (8, 8));
    }

    #[test]
    fn test_retention_window_evicts_old_frames() {
        let mut cache = cache(EmptyDetector, 2);
        let stream = StreamId::next();
        let frame = Raster::from_rgb(RgbImage::new(4, 4));
        for index in 0..5 {
            cache.process(stream, index, &frame);
        }
        // Newest is 4, window 2 keeps 2..=4
        assert!(!cache.contains(stream, 1));
        assert!(cache.contains(stream, 2));
        assert!(cache.contains(stream, 4));
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn test_forget_stream_leaves_others() {
        let mut cache = cache(EmptyDetector, 0);
        let (a, b) = (StreamId::next(), StreamId::next());
        let frame = Raster::from_rgb(RgbImage::new(4, 4));
        cache.process(a, 0, &frame);
        cache.process(b, 0, &frame);
        cache.forget_stream(a);
        assert!(!cache.contains(a, 0));
        assert!(cache.contains(b, 0));
        assert_eq!(cache.len(), 1);
    }
}
