//! Error types for preprocessing.

use std::io;
use thiserror::Error;

/// Preprocessing error.
#[derive(Error, Debug)]
pub enum PrepError {
    /// Input extension not recognized. Raised before any processing starts.
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// The input could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Trim range is empty or inverted.
    #[error("invalid trim range: start {start}s must be before end {end}s")]
    InvalidRange { start: f64, end: f64 },

    /// Sample rate conversion failed.
    #[error("resample failed: {0}")]
    Resample(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for preprocessing operations.
pub type Result<T> = std::result::Result<T, PrepError>;

impl From<hound::Error> for PrepError {
    fn from(e: hound::Error) -> Self {
        PrepError::Io(io::Error::other(e))
    }
}

impl From<rubato::ResamplerConstructionError> for PrepError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        PrepError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for PrepError {
    fn from(e: rubato::ResampleError) -> Self {
        PrepError::Resample(e.to_string())
    }
}
