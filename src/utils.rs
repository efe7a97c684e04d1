//! Utility functions for image processing and numeric conversion.

pub mod image_conversion;
pub mod safe_cast;
