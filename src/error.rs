//! Error types for the landmark detection pipeline.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Image decoding, encoding or buffer construction failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `ONNX` Runtime inference failed
    #[cfg(feature = "onnx")]
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// Invalid input parameters or unreadable source
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The landmark detector failed or returned malformed output
    #[error("Detection error: {0}")]
    Detection(String),

    /// Model loading or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Model output processing error
    #[error("Model output error: {0}")]
    ModelOutputError(String),

    /// The video stream handle became unusable
    #[error("Stream error: {0}")]
    Stream(String),

    /// Writing the landmark export failed
    #[error("Export error: {0}")]
    Export(String),

    /// Worker pool could not be built or a task was lost
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
