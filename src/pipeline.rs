//! The end-to-end remix pipeline.
//!
//! Ties the stages together: decode, trim, playback-rate shift,
//! intermediate file, then the block-streamed reverb pass into the output
//! WAV. Each run is one pass over one file; construct a new pipeline to
//! run again.

use std::path::{Path, PathBuf};

use drench_core::{ReverbParams, ReverbUnit};
use drench_prep::{decode_file, shift_speed, trim_seconds, CleanupPolicy, IntermediateFile};
use drench_stream::{
    AudioSink, AudioSource, CancelToken, DriverConfig, Outcome, RunSummary, StreamSession,
    WavSink, WavSource,
};
use tracing::info;

use crate::error::{Error, Result};

/// Result of a finished (or cancelled) pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Where the output landed.
    pub output: PathBuf,
    /// Sample rate of the output, always equal to the processed stream's.
    pub sample_rate: u32,
    /// Channel count of the output.
    pub channels: usize,
    /// Block counters and outcome from the streaming stage.
    pub summary: RunSummary,
}

/// Builder for one offline slowed-and-reverb pass.
///
/// # Example
/// ```ignore
/// use drench::prelude::*;
///
/// let report = RemixPipeline::new("holy_grail.wav")
///     .trim(6.0, 94.0)
///     .speed(0.82)
///     .reverb(ReverbParams { room_size: 0.7, ..Default::default() })
///     .run(&CancelToken::new())?;
/// eprintln!("Generated file {}", report.output.display());
/// ```
pub struct RemixPipeline {
    input: PathBuf,
    output: Option<PathBuf>,
    trim_start: Option<f64>,
    trim_end: Option<f64>,
    speed: f64,
    reverb: ReverbParams,
    block_size: usize,
    noise_floor: f32,
    max_tail_blocks: usize,
    cleanup: CleanupPolicy,
}

impl RemixPipeline {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        let driver = DriverConfig::default();
        Self {
            input: input.into(),
            output: None,
            trim_start: None,
            trim_end: None,
            speed: 1.0,
            reverb: ReverbParams::default(),
            block_size: driver.block_size,
            noise_floor: driver.noise_floor,
            max_tail_blocks: driver.max_tail_blocks,
            cleanup: CleanupPolicy::default(),
        }
    }

    /// Output path. Defaults to `<input-basename>_w_reverb.wav` in the
    /// working directory.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Keep only the `[start, end)` second range of the input.
    pub fn trim(mut self, start: f64, end: f64) -> Self {
        self.trim_start = Some(start);
        self.trim_end = Some(end);
        self
    }

    /// Playback-rate factor; below 1 slows and lowers the song.
    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn reverb(mut self, params: ReverbParams) -> Self {
        self.reverb = params;
        self
    }

    /// Frames per streamed block.
    pub fn block_size(mut self, frames: usize) -> Self {
        self.block_size = frames;
        self
    }

    /// Amplitude below which the reverb tail counts as silent.
    pub fn noise_floor(mut self, amplitude: f32) -> Self {
        self.noise_floor = amplitude;
        self
    }

    /// Upper bound on tail blocks before the run fails.
    pub fn max_tail_blocks(mut self, blocks: usize) -> Self {
        self.max_tail_blocks = blocks;
        self
    }

    /// What happens to the intermediate trimmed/retimed file.
    pub fn cleanup(mut self, policy: CleanupPolicy) -> Self {
        self.cleanup = policy;
        self
    }

    /// Run the pipeline to completion, cancellation, or failure.
    ///
    /// On failure any partially written output file stays on disk; it is
    /// never reported as a success. Cancellation keeps partial output and
    /// the intermediate file (unless the cleanup policy is `Always`).
    pub fn run(self, cancel: &CancelToken) -> Result<PipelineReport> {
        if self.block_size == 0 {
            return Err(Error::Config("block size must be positive".into()));
        }
        if self.noise_floor <= 0.0 {
            return Err(Error::Config("noise floor must be positive".into()));
        }

        let decoded = decode_file(&self.input)?;
        let sample_rate = decoded.sample_rate;
        info!(
            input = %self.input.display(),
            frames = decoded.frames(),
            sample_rate,
            "input decoded"
        );

        let mut planar = decoded.channels;
        trim_seconds(&mut planar, sample_rate, self.trim_start, self.trim_end)?;
        let planar = if (self.speed - 1.0).abs() > f64::EPSILON {
            shift_speed(&planar, sample_rate, self.speed)?
        } else {
            planar
        };

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input));
        let artifact = IntermediateFile::write(
            intermediate_path(&self.input, &output),
            &planar,
            sample_rate,
            self.cleanup,
        )?;
        drop(planar);

        let mut source = WavSource::open(artifact.path())?;
        let channels = source.channels();
        // Output format mirrors the processed stream exactly; the reverb
        // stage never resamples.
        let mut sink = WavSink::create(&output, sample_rate, channels)?;
        let mut effect = ReverbUnit::new(self.reverb);

        let config = DriverConfig {
            block_size: self.block_size,
            noise_floor: self.noise_floor,
            max_tail_blocks: self.max_tail_blocks,
        };
        let summary =
            StreamSession::new(&mut source, &mut effect, &mut sink, config).run(cancel)?;
        sink.finalize()?;

        if summary.outcome == Outcome::Completed {
            artifact.finish()?;
            info!(
                output = %output.display(),
                dry_blocks = summary.dry_blocks,
                tail_blocks = summary.tail_blocks,
                "generated output"
            );
        } else {
            info!(output = %output.display(), "run cancelled, partial output retained");
        }

        Ok(PipelineReport {
            output,
            sample_rate,
            channels,
            summary,
        })
    }
}

/// `<input-basename>_w_reverb.wav`, in the working directory.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    PathBuf::from(format!("{stem}_w_reverb.wav"))
}

/// The intermediate file sits next to the output as `<stem>_remix.wav`.
fn intermediate_path(input: &Path, output: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    output.with_file_name(format!("{stem}_remix.wav"))
}
