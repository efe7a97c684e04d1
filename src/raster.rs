//! Raster type shared by every pipeline stage.

use crate::utils::image_conversion::swap_red_blue;
use crate::{Error, Result};
use image::RgbImage;
use std::path::Path;

/// Order of the three colour samples in each pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    /// Red, green, blue
    #[default]
    Rgb,
    /// Blue, green, red (the layout most capture libraries hand out)
    Bgr,
}

impl ChannelOrder {
    /// The other channel order
    #[must_use]
    pub fn swapped(self) -> Self {
        match self {
            Self::Rgb => Self::Bgr,
            Self::Bgr => Self::Rgb,
        }
    }
}

/// A 2-D grid of 8-bit three-channel pixels with a known channel order.
///
/// Pipeline stages never draw into a raster they were handed; overlays are
/// built on copies.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pixels: RgbImage,
    order: ChannelOrder,
}

impl Raster {
    /// Wrap an existing buffer
    #[must_use]
    pub fn new(pixels: RgbImage, order: ChannelOrder) -> Self {
        Self { pixels, order }
    }

    /// Wrap an RGB buffer
    #[must_use]
    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self::new(pixels, ChannelOrder::Rgb)
    }

    /// Build a raster from interleaved samples
    ///
    /// # Errors
    ///
    /// Returns an error if the sample count does not match `width * height * 3`
    pub fn from_raw(width: u32, height: u32, samples: Vec<u8>, order: ChannelOrder) -> Result<Self> {
        let pixels = RgbImage::from_raw(width, height, samples).ok_or_else(|| {
            Error::InvalidInput(format!("Sample buffer does not match a {width}x{height} RGB raster"))
        })?;
        Ok(Self::new(pixels, order))
    }

    /// Decode an image file into an RGB raster
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded, or is empty
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path)?;
        let raster = Self::from_rgb(decoded.to_rgb8());
        if raster.is_empty() {
            return Err(Error::InvalidInput(format!("Image has no pixels: {}", path.display())));
        }
        log::debug!("Loaded {} ({}x{})", path.display(), raster.width(), raster.height());
        Ok(raster)
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// True when either dimension is zero
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Channel order of the stored samples
    #[must_use]
    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// Borrow the raw pixel buffer in its stored order
    #[must_use]
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// A copy of the pixels in RGB order
    #[must_use]
    pub fn to_rgb(&self) -> RgbImage {
        match self.order {
            ChannelOrder::Rgb => self.pixels.clone(),
            ChannelOrder::Bgr => swap_red_blue(&self.pixels),
        }
    }

    /// Consume the raster, returning RGB pixels
    #[must_use]
    pub fn into_rgb(self) -> RgbImage {
        match self.order {
            ChannelOrder::Rgb => self.pixels,
            ChannelOrder::Bgr => swap_red_blue(&self.pixels),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_bgr_to_rgb() {
        let pixels = RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]));
        let raster = Raster::new(pixels, ChannelOrder::Bgr);
        let rgb = raster.to_rgb();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([30, 20, 10]));
        // Stored samples are untouched
        assert_eq!(raster.pixels().get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_from_raw_size_mismatch() {
        let result = Raster::from_raw(4, 4, vec![0; 10], ChannelOrder::Rgb);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_open_missing_file() {
        assert!(Raster::open("does/not/exist.png").is_err());
    }

    #[test]
    fn test_channel_order_swapped() {
        assert_eq!(ChannelOrder::Rgb.swapped(), ChannelOrder::Bgr);
        assert_eq!(ChannelOrder::Bgr.swapped(), ChannelOrder::Rgb);
    }
}
