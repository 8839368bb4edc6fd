//! Preprocessing for the drench pipeline.
//!
//! Everything that happens before the streaming reverb stage lives here:
//!
//! - [`decode_file`] - load a `.wav` (or, with the `mp3` feature, `.mp3`)
//!   into planar float samples
//! - [`trim_seconds`] - cut the stream down to a `[start, end)` range
//! - [`shift_speed`] - playback-rate change by frame-rate reinterpretation,
//!   lengthening and lowering the audio for factors below 1
//! - [`IntermediateFile`] - the trimmed/retimed WAV handed to the streaming
//!   stage, with a configurable cleanup policy
//!
//! These are plain data transforms; the streaming stage downstream is where
//! the stateful work happens.

pub mod artifact;
pub mod decode;
pub mod edit;
pub mod error;

pub use artifact::{CleanupPolicy, IntermediateFile};
pub use decode::{decode_file, DecodedAudio};
pub use edit::{shift_speed, trim_seconds};
pub use error::{PrepError, Result};
