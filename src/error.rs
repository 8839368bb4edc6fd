//! Centralized error type for the drench umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate
//! boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid pipeline configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Preprocessing failed (decode, trim, retime, intermediate file).
    #[error("preprocess: {0}")]
    Prep(#[from] drench_prep::PrepError),

    /// The streaming stage failed (source, sink, effect, tail bound).
    #[error("stream: {0}")]
    Stream(#[from] drench_stream::StreamError),

    /// An effect rejected its input.
    #[error("effect: {0}")]
    Effect(#[from] drench_core::EffectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
