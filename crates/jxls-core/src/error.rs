//! Error types for the lossless encoder

use thiserror::Error;

/// Result type for encoder operations
pub type JxlsResult<T> = Result<T, JxlsError>;

/// Errors that can occur while preparing or encoding a frame
#[derive(Error, Debug)]
pub enum JxlsError {
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Unsupported channel count: {0} (must be 1-4)")]
    InvalidChannelCount(usize),

    #[error("Unsupported bit depth: {0} (must be 1-16)")]
    InvalidBitDepth(usize),

    #[error("Pixel buffer too small: expected {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("Output buffer must be at least {minimum} bytes, got {actual}")]
    OutputBufferTooSmall { minimum: usize, actual: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
