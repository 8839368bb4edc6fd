//! Error types for the streaming stage.

use drench_core::EffectError;
use thiserror::Error;

/// Streaming stage error.
///
/// Every variant is fatal to the session: the driver aborts on the spot,
/// any partially written sink output is left as-is, and file handles are
/// released by ownership on the way out. There is no retry policy - this is
/// a one-shot batch stage and the caller decides whether to rerun.
#[derive(Error, Debug)]
pub enum StreamError {
    /// I/O failure reading PCM from the source.
    #[error("source read failed: {0}")]
    SourceRead(String),

    /// I/O failure writing PCM to the sink. No further tail is flushed.
    #[error("sink write failed: {0}")]
    SinkWrite(String),

    /// The effect rejected or failed on a block.
    #[error("effect processing failed: {0}")]
    EffectProcessing(#[from] EffectError),

    /// The silence-fed tail never fell below the noise floor within the
    /// configured bound. Usually a sign of misconfigured decay parameters
    /// (a frozen reverb, say) or a noise floor set below what the effect
    /// can reach.
    #[error("tail still above {noise_floor} after {blocks} silence blocks")]
    TailNotConverging { noise_floor: f32, blocks: usize },
}

/// Result type for streaming operations.
pub type Result<T> = std::result::Result<T, StreamError>;
