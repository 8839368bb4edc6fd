//! # Drench
//!
//! Offline slowed-and-reverb pipeline, built from modular subsystems:
//!
//! - **drench-core** - PCM blocks, the stateful effect contract, and the
//!   Freeverb-topology reverb unit
//! - **drench-stream** - block sources and sinks plus the driver that
//!   drains the reverb tail past the end of the input
//! - **drench-prep** - decode, trim, playback-rate shift, and the
//!   intermediate file handed to the streaming stage
//!
//! ## Quick start
//!
//! ```ignore
//! use drench::prelude::*;
//!
//! let report = RemixPipeline::new("song.wav")
//!     .trim(6.0, 94.0)
//!     .speed(0.82)
//!     .reverb(ReverbParams {
//!         room_size: 0.7,
//!         damping: 0.7,
//!         wet_level: 0.33,
//!         dry_level: 0.8,
//!         width: 0.5,
//!         freeze_mode: 0.0,
//!     })
//!     .run(&CancelToken::new())?;
//!
//! eprintln!("Generated file {}", report.output.display());
//! ```
//!
//! ## Feature flags
//!
//! - `mp3` (default): MP3 input decoding via symphonia

pub use drench_core as core;
pub use drench_prep as prep;
pub use drench_stream as stream;

mod error;
mod pipeline;

pub use error::{Error, Result};
pub use pipeline::{PipelineReport, RemixPipeline};

// Re-exports of the types a pipeline caller touches directly
pub use drench_core::{AudioEffect, PcmBlock, ReverbParams, ReverbUnit};
pub use drench_prep::CleanupPolicy;
pub use drench_stream::{CancelToken, DriverConfig, Outcome, RunSummary};

/// Everything needed to configure and run a pipeline.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::{PipelineReport, RemixPipeline};
    pub use drench_core::{AudioEffect, PcmBlock, ReverbParams, ReverbUnit};
    pub use drench_prep::CleanupPolicy;
    pub use drench_stream::{
        AudioSink, AudioSource, CancelToken, DriverConfig, Outcome, RunSummary, StreamSession,
        WavSink, WavSource,
    };
}
