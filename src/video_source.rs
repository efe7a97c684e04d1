//! Frame sources for video playback.
//!
//! A [`FrameSource`] is the stream handle the playback session pulls from.
//! Sources yield frames in index order, report their intended frame rate
//! when they know it, and support random access for frame navigation.

use crate::raster::Raster;
use crate::{Error, Result};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// File extensions accepted in an image-sequence directory
const SEQUENCE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// A seekable stream of frames
pub trait FrameSource: Send {
    /// Read the frame at the current position and advance.
    ///
    /// Returns `Ok(None)` once the stream is exhausted. An error means the
    /// stream itself is no longer usable.
    fn read(&mut self) -> Result<Option<Raster>>;

    /// Index of the frame the next `read` returns
    fn position(&self) -> u64;

    /// Move to an absolute frame index
    fn seek(&mut self, index: u64) -> Result<()>;

    /// Intended playback rate, if known
    fn fps(&self) -> Option<f64>;

    /// Total number of frames, if known
    fn frame_count(&self) -> Option<u64>;

    /// Short human readable description
    fn describe(&self) -> String;

    /// Release any underlying handles. Reading afterwards yields nothing.
    fn release(&mut self) {}
}

/// Frames held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: Vec<Raster>,
    position: usize,
    fps: Option<f64>,
    label: String,
}

impl MemorySource {
    /// Wrap a list of frames
    #[must_use]
    pub fn new(frames: Vec<Raster>, fps: Option<f64>) -> Self {
        Self {
            frames,
            position: 0,
            fps,
            label: "memory".to_string(),
        }
    }

    /// Decode every frame of an animated GIF.
    ///
    /// The frame rate is derived from the first frame's delay.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or decoded, or holds no frames
    pub fn from_gif<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let decoder = GifDecoder::new(BufReader::new(File::open(path)?))?;
        let frames = decoder.into_frames().collect_frames()?;
        if frames.is_empty() {
            return Err(Error::InvalidInput(format!("{} contains no frames", path.display())));
        }

        let (numer, denom) = frames[0].delay().numer_denom_ms();
        let fps = (numer > 0 && denom > 0).then(|| 1000.0 * f64::from(denom) / f64::from(numer));

        let rasters: Vec<Raster> = frames
            .into_iter()
            .map(|frame| Raster::from_rgb(DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8()))
            .collect();
        log::info!(
            "Decoded {} frame(s) from {} ({})",
            rasters.len(),
            path.display(),
            fps.map_or_else(|| "unknown rate".to_string(), |fps| format!("{fps:.2} fps"))
        );

        Ok(Self {
            frames: rasters,
            position: 0,
            fps,
            label: path.display().to_string(),
        })
    }
}

impl FrameSource for MemorySource {
    fn read(&mut self) -> Result<Option<Raster>> {
        let frame = self.frames.get(self.position).cloned();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }

    fn position(&self) -> u64 {
        self.position as u64
    }

    fn seek(&mut self, index: u64) -> Result<()> {
        let index = usize::try_from(index).map_err(|_| Error::InvalidInput(format!("Frame index {index} out of range")))?;
        self.position = index.min(self.frames.len());
        Ok(())
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.frames.len() as u64)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }

    fn release(&mut self) {
        self.frames.clear();
        self.position = 0;
    }
}

/// Directory of still images played back in file-name order
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    directory: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
    fps: Option<f64>,
}

impl ImageSequenceSource {
    /// List the images in `directory`
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or holds no images
    pub fn open<P: AsRef<Path>>(directory: P, fps: Option<f64>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&directory)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SEQUENCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if path.is_file() && is_image {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(Error::InvalidInput(format!(
                "No image frames found in {}",
                directory.display()
            )));
        }
        files.sort();
        log::info!("Opened {} frame(s) from {}", files.len(), directory.display());

        Ok(Self {
            directory,
            files,
            position: 0,
            fps,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Result<Option<Raster>> {
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        let raster = Raster::open(path)
            .map_err(|e| Error::Stream(format!("Failed to read frame {}: {e}", path.display())))?;
        self.position += 1;
        Ok(Some(raster))
    }

    fn position(&self) -> u64 {
        self.position as u64
    }

    fn seek(&mut self, index: u64) -> Result<()> {
        let index = usize::try_from(index).map_err(|_| Error::InvalidInput(format!("Frame index {index} out of range")))?;
        self.position = index.min(self.files.len());
        Ok(())
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.files.len() as u64)
    }

    fn describe(&self) -> String {
        self.directory.display().to_string()
    }

    fn release(&mut self) {
        self.files.clear();
        self.position = 0;
    }
}

/// Open a video source by path: a directory becomes an image sequence,
/// a `.gif` file an animated source.
///
/// # Errors
///
/// Returns an error if the path does not exist, has an unsupported format,
/// or cannot be decoded
pub fn open_source<P: AsRef<Path>>(path: P, fps: Option<f64>) -> Result<Box<dyn FrameSource>> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(Box::new(ImageSequenceSource::open(path, fps)?));
    }
    if !path.exists() {
        return Err(Error::InvalidInput(format!("Video source not found: {}", path.display())));
    }

    let is_gif = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gif"));
    if !is_gif {
        return Err(Error::InvalidInput(format!(
            "Unsupported video source {} (expected a frame directory or a GIF)",
            path.display()
        )));
    }

    let mut source = MemorySource::from_gif(path)?;
    if fps.is_some() {
        source.fps = fps;
    }
    Ok(Box::new(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn frames(n: u8) -> Vec<Raster> {
        (0..n)
            .map(|i| Raster::from_rgb(RgbImage::from_pixel(2, 2, Rgb([i, i, i]))))
            .collect()
    }

    #[test]
    fn test_memory_source_reads_in_order() {
        let mut source = MemorySource::new(frames(3), Some(25.0));
        assert_eq!(source.frame_count(), Some(3));
        for expected in 0..3u8 {
            let frame = source.read().unwrap().unwrap();
            assert_eq!(frame.pixels().get_pixel(0, 0).0, [expected; 3]);
        }
        assert!(source.read().unwrap().is_none());
        assert_eq!(source.position(), 3);
    }

    #[test]
    fn test_memory_source_seek() {
        let mut source = MemorySource::new(frames(5), None);
        source.seek(3).unwrap();
        let frame = source.read().unwrap().unwrap();
        assert_eq!(frame.pixels().get_pixel(0, 0).0, [3; 3]);
        source.seek(99).unwrap();
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_release_empties_source() {
        let mut source = MemorySource::new(frames(2), None);
        source.release();
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_image_sequence_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for (name, value) in [("b.png", 20u8), ("a.png", 10u8), ("notes.txt", 0u8)] {
            let path = dir.path().join(name);
            if name.ends_with(".png") {
                RgbImage::from_pixel(3, 3, Rgb([value; 3])).save(&path).unwrap();
            } else {
                std::fs::write(&path, "not a frame").unwrap();
            }
        }
        let mut source = ImageSequenceSource::open(dir.path(), Some(10.0)).unwrap();
        assert_eq!(source.frame_count(), Some(2));
        assert_eq!(source.read().unwrap().unwrap().pixels().get_pixel(0, 0).0, [10; 3]);
        assert_eq!(source.read().unwrap().unwrap().pixels().get_pixel(0, 0).0, [20; 3]);
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_image_sequence_unreadable_frame_is_stream_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0001.png"), b"garbage").unwrap();
        let mut source = ImageSequenceSource::open(dir.path(), None).unwrap();
        assert!(matches!(source.read(), Err(Error::Stream(_))));
    }

    #[test]
    fn test_open_source_rejects_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(open_source(&path, None), Err(Error::InvalidInput(_))));
        assert!(open_source(dir.path().join("missing.gif"), None).is_err());
    }

    #[test]
    fn test_empty_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSequenceSource::open(dir.path(), None).is_err());
    }
}
