//! The block-stream driver.
//!
//! A [`StreamSession`] pumps a finite dry stream plus a synthetic silence
//! tail through a stateful effect:
//!
//! - **Dry streaming**: read up to `block_size` frames, process, write.
//!   The final block may be short; it is written as-is, never padded.
//! - **Tail draining**: once the source is exhausted, feed all-zero blocks
//!   through the effect and write them until the output peak falls below
//!   the noise floor. The first sub-threshold block is discarded, not
//!   written.
//!
//! The effect's state is never reset between blocks - the tail exists only
//! because the delay lines keep ringing across the dry/tail boundary.
//!
//! Tail draining is bounded by `max_tail_blocks`; an effect that never
//! decays (frozen reverb, unity feedback) fails the session with
//! [`StreamError::TailNotConverging`] instead of spinning forever.

use drench_core::{AudioEffect, PcmBlock};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::{Result, StreamError};
use crate::sink::AudioSink;
use crate::source::AudioSource;

/// Driver configuration, fixed for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverConfig {
    /// Frames per block.
    pub block_size: usize,
    /// Amplitude below which the tail counts as inaudible.
    pub noise_floor: f32,
    /// Upper bound on tail blocks before the session fails.
    pub max_tail_blocks: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            block_size: 16_384,
            noise_floor: 1e-4,
            max_tail_blocks: 8_192,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Dry stream fully consumed and tail drained below the noise floor.
    Completed,
    /// Stopped at a block boundary on request; partial output retained.
    Cancelled,
}

/// Counters and outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Total frames consumed from the source.
    pub frames_read: u64,
    /// Blocks written during dry streaming.
    pub dry_blocks: usize,
    /// Tail blocks written after the source was exhausted.
    pub tail_blocks: usize,
    pub outcome: Outcome,
}

/// Session phase. Transitions only ever move forward:
/// `Init -> DryStreaming -> TailDraining -> Completed`, with `Failed`
/// reachable from anywhere. Tail draining cannot start until dry streaming
/// has consumed the entire source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    DryStreaming,
    TailDraining,
    Completed,
    Failed,
}

/// One streaming run: a source, an effect, and a sink bound together with
/// a fixed block size and noise floor.
///
/// Exactly one run per session; [`run`](StreamSession::run) consumes it.
/// The session borrows its collaborators, so the caller keeps ownership -
/// and with it the drop-based resource release - on every exit path.
pub struct StreamSession<'a> {
    source: &'a mut dyn AudioSource,
    effect: &'a mut dyn AudioEffect,
    sink: &'a mut dyn AudioSink,
    config: DriverConfig,
    phase: Phase,
}

impl<'a> StreamSession<'a> {
    /// # Panics
    ///
    /// Panics if `block_size` is zero or `noise_floor` is not positive.
    pub fn new(
        source: &'a mut dyn AudioSource,
        effect: &'a mut dyn AudioEffect,
        sink: &'a mut dyn AudioSink,
        config: DriverConfig,
    ) -> Self {
        assert!(config.block_size > 0, "block size must be positive");
        assert!(config.noise_floor > 0.0, "noise floor must be positive");
        Self {
            source,
            effect,
            sink,
            config,
            phase: Phase::Init,
        }
    }

    /// Drive the stream to completion, cancellation, or failure.
    pub fn run(mut self, cancel: &CancelToken) -> Result<RunSummary> {
        match self.run_phases(cancel) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }

    fn run_phases(&mut self, cancel: &CancelToken) -> Result<RunSummary> {
        let mut summary = RunSummary {
            frames_read: 0,
            dry_blocks: 0,
            tail_blocks: 0,
            outcome: Outcome::Completed,
        };

        loop {
            self.phase = match self.phase {
                Phase::Init => {
                    self.effect.set_sample_rate(self.source.sample_rate() as f64);
                    Phase::DryStreaming
                }

                Phase::DryStreaming => {
                    if cancel.is_cancelled() {
                        summary.outcome = Outcome::Cancelled;
                        Phase::Completed
                    } else {
                        let mut block = self.source.read_block(self.config.block_size)?;
                        if block.is_empty() {
                            debug!(
                                frames = summary.frames_read,
                                blocks = summary.dry_blocks,
                                "dry stream exhausted, draining tail"
                            );
                            Phase::TailDraining
                        } else {
                            summary.frames_read += block.frames() as u64;
                            self.effect.process(&mut block)?;
                            self.sink.write_block(&block)?;
                            summary.dry_blocks += 1;
                            Phase::DryStreaming
                        }
                    }
                }

                Phase::TailDraining => {
                    if cancel.is_cancelled() {
                        summary.outcome = Outcome::Cancelled;
                        Phase::Completed
                    } else if summary.tail_blocks >= self.config.max_tail_blocks {
                        return Err(StreamError::TailNotConverging {
                            noise_floor: self.config.noise_floor,
                            blocks: summary.tail_blocks,
                        });
                    } else {
                        let mut block =
                            PcmBlock::silence(self.config.block_size, self.source.channels());
                        self.effect.process(&mut block)?;
                        if block.peak() < self.config.noise_floor {
                            // The first sub-threshold block is discarded:
                            // the tail ends with the last audible block.
                            debug!(blocks = summary.tail_blocks, "tail below noise floor");
                            Phase::Completed
                        } else {
                            self.sink.write_block(&block)?;
                            summary.tail_blocks += 1;
                            Phase::TailDraining
                        }
                    }
                }

                Phase::Completed => return Ok(summary),

                // Failed is set by `run` after an error propagates; the
                // phase loop itself never resumes from it.
                Phase::Failed => unreachable!("failed sessions do not resume"),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drench_core::{EffectError, ReverbParams, ReverbUnit};

    /// In-memory source slicing a planar buffer into blocks, with an
    /// optional injected read failure.
    struct MemorySource {
        channels: Vec<Vec<f32>>,
        sample_rate: u32,
        pos: usize,
        fail_on_read: Option<usize>,
        reads: usize,
    }

    impl MemorySource {
        fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
            Self {
                channels,
                sample_rate,
                pos: 0,
                fail_on_read: None,
                reads: 0,
            }
        }

        fn constant(value: f32, frames: usize, channels: usize, sample_rate: u32) -> Self {
            Self::new(vec![vec![value; frames]; channels], sample_rate)
        }
    }

    impl AudioSource for MemorySource {
        fn channels(&self) -> usize {
            self.channels.len()
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn read_block(&mut self, max_frames: usize) -> Result<PcmBlock> {
            if self.fail_on_read == Some(self.reads) {
                return Err(StreamError::SourceRead("injected read failure".into()));
            }
            self.reads += 1;
            let remaining = self.channels[0].len() - self.pos;
            let take = remaining.min(max_frames);
            let planar = self
                .channels
                .iter()
                .map(|c| c[self.pos..self.pos + take].to_vec())
                .collect();
            self.pos += take;
            Ok(PcmBlock::from_planar(planar))
        }
    }

    /// In-memory sink collecting written blocks, with an optional injected
    /// write failure.
    #[derive(Default)]
    struct MemorySink {
        blocks: Vec<PcmBlock>,
        fail_on_block: Option<usize>,
        finalized: bool,
    }

    impl MemorySink {
        fn frames_written(&self) -> u64 {
            self.blocks.iter().map(|b| b.frames() as u64).sum()
        }
    }

    impl AudioSink for MemorySink {
        fn write_block(&mut self, block: &PcmBlock) -> Result<()> {
            if self.fail_on_block == Some(self.blocks.len()) {
                return Err(StreamError::SinkWrite("injected write failure".into()));
            }
            self.blocks.push(block.clone());
            Ok(())
        }

        fn finalize(&mut self) -> Result<()> {
            self.finalized = true;
            Ok(())
        }
    }

    /// Stateless passthrough.
    struct Passthrough;

    impl AudioEffect for Passthrough {
        fn set_sample_rate(&mut self, _sample_rate: f64) {}
        fn process(&mut self, _block: &mut PcmBlock) -> std::result::Result<(), EffectError> {
            Ok(())
        }
        fn reset(&mut self) {}
    }

    /// Adds a constant echo level to every sample and lets it decay
    /// geometrically block over block. Fed silence, the output peak is
    /// exactly the current level, so tail behavior is fully predictable.
    struct FadingEcho {
        level: f32,
        decay: f32,
    }

    impl FadingEcho {
        fn new(decay: f32) -> Self {
            Self { level: 0.0, decay }
        }
    }

    impl AudioEffect for FadingEcho {
        fn set_sample_rate(&mut self, _sample_rate: f64) {}

        fn process(&mut self, block: &mut PcmBlock) -> std::result::Result<(), EffectError> {
            let level = self.level;
            let mut input_peak = 0.0f32;
            for ch in 0..block.channels() {
                for sample in block.channel_mut(ch) {
                    input_peak = input_peak.max(sample.abs());
                    *sample += level;
                }
            }
            self.level = (self.level.max(input_peak)) * self.decay;
            Ok(())
        }

        fn reset(&mut self) {
            self.level = 0.0;
        }
    }

    /// Never decays: emits full-scale output no matter the input.
    struct Unquiet;

    impl AudioEffect for Unquiet {
        fn set_sample_rate(&mut self, _sample_rate: f64) {}
        fn process(&mut self, block: &mut PcmBlock) -> std::result::Result<(), EffectError> {
            for ch in 0..block.channels() {
                block.channel_mut(ch).fill(1.0);
            }
            Ok(())
        }
        fn reset(&mut self) {}
    }

    /// Cancels a shared token while processing its nth block.
    struct CancellingEffect {
        token: CancelToken,
        cancel_on_block: usize,
        seen: usize,
    }

    impl AudioEffect for CancellingEffect {
        fn set_sample_rate(&mut self, _sample_rate: f64) {}
        fn process(&mut self, _block: &mut PcmBlock) -> std::result::Result<(), EffectError> {
            if self.seen == self.cancel_on_block {
                self.token.cancel();
            }
            self.seen += 1;
            Ok(())
        }
        fn reset(&mut self) {}
    }

    fn config(block_size: usize) -> DriverConfig {
        DriverConfig {
            block_size,
            noise_floor: 1e-4,
            max_tail_blocks: 1024,
        }
    }

    fn run_session(
        source: &mut MemorySource,
        effect: &mut dyn AudioEffect,
        sink: &mut MemorySink,
        config: DriverConfig,
    ) -> Result<RunSummary> {
        let cancel = CancelToken::new();
        StreamSession::new(source, effect, sink, config).run(&cancel)
    }

    #[test]
    fn every_source_frame_is_written_exactly_once() {
        // 10_000 is not a multiple of 4096: the last dry block is short.
        let mut source = MemorySource::constant(0.5, 10_000, 2, 44_100);
        let mut effect = Passthrough;
        let mut sink = MemorySink::default();

        let summary =
            run_session(&mut source, &mut effect, &mut sink, config(4096)).unwrap();

        assert_eq!(summary.frames_read, 10_000);
        assert_eq!(summary.dry_blocks, 3);
        assert_eq!(summary.tail_blocks, 0);
        assert_eq!(summary.outcome, Outcome::Completed);
        assert_eq!(sink.frames_written(), 10_000);
        assert_eq!(sink.blocks[0].frames(), 4096);
        assert_eq!(sink.blocks[2].frames(), 10_000 % 4096);
    }

    #[test]
    fn empty_source_still_drains_and_terminates() {
        let mut source = MemorySource::constant(0.0, 0, 2, 44_100);
        let mut effect = Passthrough;
        let mut sink = MemorySink::default();

        let summary =
            run_session(&mut source, &mut effect, &mut sink, config(1024)).unwrap();

        // A stateless effect fed silence is sub-threshold immediately:
        // zero dry blocks, zero written tail blocks, clean completion.
        assert_eq!(summary.frames_read, 0);
        assert_eq!(summary.dry_blocks, 0);
        assert_eq!(summary.tail_blocks, 0);
        assert!(sink.blocks.is_empty());
    }

    #[test]
    fn tail_ends_with_last_audible_block() {
        let decay = 0.5;
        let mut source = MemorySource::constant(1.0, 2048, 1, 44_100);
        let mut effect = FadingEcho::new(decay);
        let mut sink = MemorySink::default();

        let cfg = config(1024);
        let summary = run_session(&mut source, &mut effect, &mut sink, cfg).unwrap();

        assert_eq!(summary.dry_blocks, 2);
        assert!(summary.tail_blocks > 0);

        // Every written tail block is audible, and the echo level left in
        // the effect (the block that was discarded) is not.
        let tail = &sink.blocks[summary.dry_blocks..];
        assert_eq!(tail.len(), summary.tail_blocks);
        for block in tail {
            assert!(block.peak() >= cfg.noise_floor);
            assert_eq!(block.frames(), cfg.block_size);
        }
        assert!(tail[tail.len() - 1].peak() * decay < cfg.noise_floor);
    }

    #[test]
    fn tail_block_count_matches_geometric_decay() {
        let decay = 0.5f32;
        let mut source = MemorySource::constant(1.0, 1024, 1, 44_100);
        let mut effect = FadingEcho::new(decay);
        let mut sink = MemorySink::default();

        let cfg = config(1024);
        let summary = run_session(&mut source, &mut effect, &mut sink, cfg).unwrap();

        // After the single dry block the echo level is decay * peak; each
        // tail block halves it. Count how many halvings stay audible.
        let mut level = decay;
        let mut expected = 0;
        while level >= cfg.noise_floor {
            expected += 1;
            level *= decay;
        }
        assert_eq!(summary.tail_blocks, expected);
    }

    #[test]
    fn identical_runs_produce_identical_output() {
        let cfg = config(512);

        let mut outputs = Vec::new();
        for _ in 0..2 {
            let mut source = MemorySource::new(
                vec![(0..3000).map(|i| (i as f32 / 3000.0) - 0.5).collect(); 2],
                44_100,
            );
            let mut effect = FadingEcho::new(0.25);
            let mut sink = MemorySink::default();
            run_session(&mut source, &mut effect, &mut sink, cfg).unwrap();
            outputs.push(sink.blocks);
        }

        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn sink_failure_aborts_without_tail() {
        let mut source = MemorySource::constant(1.0, 8192, 1, 44_100);
        let mut effect = FadingEcho::new(0.5);
        let mut sink = MemorySink {
            fail_on_block: Some(2),
            ..Default::default()
        };

        let result = run_session(&mut source, &mut effect, &mut sink, config(1024));

        assert!(matches!(result, Err(StreamError::SinkWrite(_))));
        // The failing write was dry block 2; nothing after it - and in
        // particular no tail block - ever reached the sink.
        assert_eq!(sink.blocks.len(), 2);
        assert!(!sink.finalized);
    }

    #[test]
    fn source_failure_aborts_the_session() {
        let mut source = MemorySource::constant(1.0, 8192, 1, 44_100);
        source.fail_on_read = Some(3);
        let mut effect = Passthrough;
        let mut sink = MemorySink::default();

        let result = run_session(&mut source, &mut effect, &mut sink, config(1024));

        assert!(matches!(result, Err(StreamError::SourceRead(_))));
        assert_eq!(sink.blocks.len(), 3);
    }

    #[test]
    fn non_decaying_effect_fails_at_the_bound() {
        let mut source = MemorySource::constant(1.0, 100, 1, 44_100);
        let mut effect = Unquiet;
        let mut sink = MemorySink::default();

        let cfg = DriverConfig {
            block_size: 64,
            noise_floor: 1e-4,
            max_tail_blocks: 16,
        };
        let result = run_session(&mut source, &mut effect, &mut sink, cfg);

        match result {
            Err(StreamError::TailNotConverging { blocks, .. }) => assert_eq!(blocks, 16),
            other => panic!("expected TailNotConverging, got {other:?}"),
        }
        // 2 dry blocks (100 frames / 64) plus the bounded tail.
        assert_eq!(sink.blocks.len(), 2 + 16);
    }

    #[test]
    fn pre_cancelled_session_writes_nothing() {
        let mut source = MemorySource::constant(1.0, 4096, 1, 44_100);
        let mut effect = Passthrough;
        let mut sink = MemorySink::default();

        let cancel = CancelToken::new();
        cancel.cancel();
        let summary = StreamSession::new(&mut source, &mut effect, &mut sink, config(1024))
            .run(&cancel)
            .unwrap();

        assert_eq!(summary.outcome, Outcome::Cancelled);
        assert_eq!(summary.dry_blocks, 0);
        assert!(sink.blocks.is_empty());
    }

    #[test]
    fn cancellation_stops_at_the_next_block_boundary() {
        let mut source = MemorySource::constant(1.0, 8192, 1, 44_100);
        let cancel = CancelToken::new();
        let mut effect = CancellingEffect {
            token: cancel.clone(),
            cancel_on_block: 2,
            seen: 0,
        };
        let mut sink = MemorySink::default();

        let summary = StreamSession::new(&mut source, &mut effect, &mut sink, config(1024))
            .run(&cancel)
            .unwrap();

        // The block being processed when the request landed is completed
        // and written; the session stops before reading the next one.
        assert_eq!(summary.outcome, Outcome::Cancelled);
        assert_eq!(summary.dry_blocks, 3);
        assert_eq!(sink.blocks.len(), 3);
    }

    #[test]
    fn dry_block_counts_match_the_large_stream_layout() {
        // 4M frames at block size 16384: 245 dry blocks, the last short.
        let frames = 4_000_000usize;
        let mut source = MemorySource::constant(0.1, frames, 1, 44_100);
        let mut effect = Passthrough;
        let mut sink = MemorySink::default();

        let summary =
            run_session(&mut source, &mut effect, &mut sink, DriverConfig::default()).unwrap();

        assert_eq!(summary.dry_blocks, frames.div_ceil(16_384));
        assert_eq!(summary.dry_blocks, 245);
        assert_eq!(
            sink.blocks.last().unwrap().frames(),
            frames % 16_384
        );
        assert_eq!(summary.frames_read, frames as u64);
    }

    #[test]
    fn reverb_session_appends_a_tail() {
        let mut source = MemorySource::constant(0.5, 4096, 2, 44_100);
        let mut effect = ReverbUnit::new(ReverbParams::default());
        let mut sink = MemorySink::default();

        let cfg = DriverConfig {
            block_size: 1024,
            noise_floor: 1e-4,
            max_tail_blocks: 4096,
        };
        let summary = run_session(&mut source, &mut effect, &mut sink, cfg).unwrap();

        assert_eq!(summary.dry_blocks, 4);
        assert!(
            summary.tail_blocks > 0,
            "reverb must ring past the dry stream"
        );
        assert_eq!(summary.outcome, Outcome::Completed);
    }

    #[test]
    #[should_panic(expected = "block size")]
    fn zero_block_size_is_refused() {
        let mut source = MemorySource::constant(0.0, 0, 1, 44_100);
        let mut effect = Passthrough;
        let mut sink = MemorySink::default();
        let _ = StreamSession::new(
            &mut source,
            &mut effect,
            &mut sink,
            DriverConfig {
                block_size: 0,
                ..Default::default()
            },
        );
    }
}
