//! Pixel-level helpers: channel swapping, resampling and alpha blending.

use crate::utils::safe_cast::f64_to_u32;
use crate::{Error, Result};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Swap the first and third channel of every pixel (RGB <-> BGR)
#[must_use]
pub fn swap_red_blue(image: &RgbImage) -> RgbImage {
    let mut swapped = image.clone();
    for pixel in swapped.pixels_mut() {
        pixel.0.swap(0, 2);
    }
    swapped
}

/// Resize with Lanczos interpolation, used for upscaling small sources
#[must_use]
pub fn resize_high_quality(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Lanczos3)
}

/// Resize with bilinear interpolation, used for the search resamples
#[must_use]
pub fn resize_linear(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Resize back to a target size, averaging source areas when shrinking
///
/// Each destination pixel is the coverage-weighted mean of the source pixels
/// it overlaps, so downscaled overlays keep thin mesh lines visible instead
/// of aliasing them away. Enlargements fall back to Lanczos.
///
/// # Errors
///
/// Returns an error if either target dimension is zero
pub fn resize_area(image: &RgbImage, width: u32, height: u32) -> Result<RgbImage> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidInput(format!("Cannot resize to {width}x{height}")));
    }
    let (src_w, src_h) = image.dimensions();
    if (src_w, src_h) == (width, height) {
        return Ok(image.clone());
    }
    if width > src_w || height > src_h {
        return Ok(resize_high_quality(image, width, height));
    }

    let x_weights = area_weights(src_w, width);
    let y_weights = area_weights(src_h, height);

    // Horizontal pass into a float buffer of width x src_h
    let dst_w = width as usize;
    let mut horizontal = vec![0.0f32; dst_w * src_h as usize * 3];
    for y in 0..src_h {
        let row_offset = y as usize * dst_w;
        for (dx, weights) in x_weights.iter().enumerate() {
            let mut acc = [0.0f32; 3];
            for &(sx, w) in weights {
                let p = image.get_pixel(sx, y);
                for ch in 0..3 {
                    acc[ch] += f32::from(p.0[ch]) * w;
                }
            }
            let idx = (row_offset + dx) * 3;
            horizontal[idx..idx + 3].copy_from_slice(&acc);
        }
    }

    let mut output = RgbImage::new(width, height);
    for (dy, weights) in y_weights.iter().enumerate() {
        for dx in 0..dst_w {
            let mut acc = [0.0f32; 3];
            for &(sy, w) in weights {
                let idx = (sy as usize * dst_w + dx) * 3;
                for ch in 0..3 {
                    acc[ch] += horizontal[idx + ch] * w;
                }
            }
            #[allow(clippy::cast_possible_truncation)] // indices bounded by u32 dimensions
            output.put_pixel(dx as u32, dy as u32, Rgb(acc.map(to_sample)));
        }
    }
    Ok(output)
}

/// Weighted sum `alpha * top + (1 - alpha) * bottom` per channel
///
/// # Errors
///
/// Returns an error if the two images differ in size or alpha is outside [0, 1]
pub fn blend_weighted(top: &RgbImage, bottom: &RgbImage, alpha: f32) -> Result<RgbImage> {
    if top.dimensions() != bottom.dimensions() {
        return Err(Error::InvalidInput(format!(
            "Cannot blend {:?} over {:?}",
            top.dimensions(),
            bottom.dimensions()
        )));
    }
    if !(0.0..=1.0).contains(&alpha) {
        return Err(Error::InvalidInput(format!("Blend factor {alpha} outside [0, 1]")));
    }
    let beta = 1.0 - alpha;
    let mut output = bottom.clone();
    for (out, over) in output.pixels_mut().zip(top.pixels()) {
        for ch in 0..3 {
            out.0[ch] = to_sample(f32::from(over.0[ch]) * alpha + f32::from(out.0[ch]) * beta);
        }
    }
    Ok(output)
}

/// Scale both sides of `image` by `factor` with the given resampler
///
/// # Errors
///
/// Returns an error if the factor is not positive or the result overflows
pub fn scale_by(image: &RgbImage, factor: f64, high_quality: bool) -> Result<RgbImage> {
    let width = crate::utils::safe_cast::scaled_dimension(image.width(), factor)?;
    let height = crate::utils::safe_cast::scaled_dimension(image.height(), factor)?;
    Ok(if high_quality {
        resize_high_quality(image, width, height)
    } else {
        resize_linear(image, width, height)
    })
}

/// Source indices and coverage weights for each destination sample
fn area_weights(src: u32, dst: u32) -> Vec<Vec<(u32, f32)>> {
    let scale = f64::from(src) / f64::from(dst);
    (0..dst)
        .map(|d| {
            let start = f64::from(d) * scale;
            let end = (f64::from(d) + 1.0) * scale;
            let first = f64_to_u32(start.floor()).unwrap_or(0);
            let last = f64_to_u32(end.ceil()).unwrap_or(src).min(src);
            (first..last)
                .filter_map(|s| {
                    let s_f = f64::from(s);
                    let overlap = end.min(s_f + 1.0) - start.max(s_f);
                    #[allow(clippy::cast_possible_truncation)] // weights are in (0, 1]
                    (overlap > 0.0).then(|| (s, (overlap / scale) as f32))
                })
                .collect()
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation)] // clamped to u8 range first
#[allow(clippy::cast_sign_loss)]
fn to_sample(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
