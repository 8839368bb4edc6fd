//! Error types for effect processing.

use thiserror::Error;

/// Effect processing error.
#[derive(Error, Debug)]
pub enum EffectError {
    /// The effect does not support this channel layout.
    #[error("unsupported channel layout: {0} channel(s)")]
    ChannelLayout(usize),

    /// A block changed shape mid-stream.
    #[error("block shape changed mid-stream: expected {expected} channel(s), got {got}")]
    ShapeChanged { expected: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for effect operations.
pub type Result<T> = std::result::Result<T, EffectError>;
