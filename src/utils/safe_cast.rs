//! Checked numeric conversions for raster dimensions and pixel coordinates

use crate::{Error, Result};

/// Safely convert f64 to u32 with bounds checking
///
/// # Errors
///
/// Returns an error if the value is not finite or outside u32 range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is safe
#[allow(clippy::cast_sign_loss)] // Sign checked above
pub fn f64_to_u32(value: f64) -> Result<u32> {
    if value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX) {
        Ok(value as u32)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to u32"
        )))
    }
}

/// Dimension of a raster side after resampling by `factor`, rounded and never zero
///
/// # Errors
///
/// Returns an error if the factor is not a positive finite number or the
/// result does not fit in u32
pub fn scaled_dimension(dimension: u32, factor: f64) -> Result<u32> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(Error::InvalidInput(format!("Scale factor must be positive, got {factor}")));
    }
    let scaled = (f64::from(dimension) * factor).round();
    Ok(f64_to_u32(scaled)?.max(1))
}

/// Clamp and convert f32 to i32 for pixel coordinates
#[must_use]
#[allow(clippy::cast_precision_loss)] // Acceptable for clamping bounds
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
pub fn f32_to_i32_clamp(value: f32, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    let clamped = value.round().clamp(min as f32, max as f32);
    (clamped as i32).clamp(min, max)
}

/// Convert a u32 dimension to i32 for drawing APIs, saturating at `i32::MAX`
#[must_use]
pub fn u32_to_i32_saturating(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_f64_to_u32() {
        assert_eq!(f64_to_u32(42.0).unwrap(), 42);
        assert_eq!(f64_to_u32(0.0).unwrap(), 0);
        assert!(f64_to_u32(-1.0).is_err());
        assert!(f64_to_u32(f64::NAN).is_err());
        assert!(f64_to_u32(f64::INFINITY).is_err());
        assert!(f64_to_u32(f64::from(u32::MAX) + 1.0).is_err());
    }

    #[test]
    fn test_scaled_dimension() {
        assert_eq!(scaled_dimension(320, 2.0).unwrap(), 640);
        assert_eq!(scaled_dimension(640, 1.5).unwrap(), 960);
        assert_eq!(scaled_dimension(101, 0.75).unwrap(), 76);
        // Never collapses to zero
        assert_eq!(scaled_dimension(1, 0.1).unwrap(), 1);
        assert!(scaled_dimension(100, 0.0).is_err());
        assert!(scaled_dimension(100, -2.0).is_err());
        assert!(scaled_dimension(100, f64::NAN).is_err());
    }

    #[test]
    fn test_f32_to_i32_clamp() {
        assert_eq!(f32_to_i32_clamp(50.0, 0, 100), 50);
        assert_eq!(f32_to_i32_clamp(49.6, 0, 100), 50);
        assert_eq!(f32_to_i32_clamp(-10.0, 0, 100), 0);
        assert_eq!(f32_to_i32_clamp(150.0, 0, 100), 100);
        assert_eq!(f32_to_i32_clamp(f32::NAN, 0, 100), 0);
        assert_eq!(f32_to_i32_clamp(f32::INFINITY, 0, 100), 0);
    }

    #[test]
    fn test_u32_to_i32_saturating() {
        assert_eq!(u32_to_i32_saturating(640), 640);
        assert_eq!(u32_to_i32_saturating(u32::MAX), i32::MAX);
    }

    proptest! {
        #[test]
        fn prop_f32_to_i32_clamp_always_within_bounds(
            value in any::<f32>(),
            min in any::<i32>(),
            max in any::<i32>()
        ) {
            let (min, max) = if min <= max { (min, max) } else { (max, min) };
            let result = f32_to_i32_clamp(value, min, max);
            prop_assert!(result >= min);
            prop_assert!(result <= max);
        }

        #[test]
        fn prop_scaled_dimension_positive(dimension in 1u32..10_000, factor in 0.01f64..4.0) {
            let scaled = scaled_dimension(dimension, factor).unwrap();
            prop_assert!(scaled >= 1);
            prop_assert!((f64::from(scaled) - f64::from(dimension) * factor).abs() <= 1.0);
        }
    }
}
