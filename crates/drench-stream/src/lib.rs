//! Block streaming for the drench pipeline.
//!
//! The centerpiece is [`StreamSession`]: it pulls fixed-size blocks from an
//! [`AudioSource`], pushes them through a stateful
//! [`AudioEffect`](drench_core::AudioEffect), and writes the results to an
//! [`AudioSink`]. When the source runs dry the session keeps feeding the
//! effect silence until the decay tail falls below a noise floor, so the
//! written file carries the full reverb tail instead of cutting it off at
//! the last input sample.
//!
//! Everything is synchronous and strictly ordered: one read, one process,
//! one write per block, with cancellation checked only at block boundaries.

pub mod cancel;
pub mod driver;
pub mod error;
pub mod sink;
pub mod source;

pub use cancel::CancelToken;
pub use driver::{DriverConfig, Outcome, RunSummary, StreamSession};
pub use error::{Result, StreamError};
pub use sink::{AudioSink, WavSink};
pub use source::{AudioSource, WavSource};
