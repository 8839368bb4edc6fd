//! Sequential block-oriented PCM readers.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use drench_core::PcmBlock;
use hound::{SampleFormat, WavReader};

use crate::error::{Result, StreamError};

/// Sequential block reader over a PCM stream.
///
/// Channel count and sample rate are fixed for the stream's lifetime and
/// queryable before the first read. A read returns fewer frames than asked
/// only at the end of the stream, and an empty block exactly when the
/// stream is exhausted (and on every read after that).
pub trait AudioSource {
    /// Channel count of the stream.
    fn channels(&self) -> usize;

    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Read up to `max_frames` frames.
    ///
    /// Errors must be reported as [`StreamError::SourceRead`].
    fn read_block(&mut self, max_frames: usize) -> Result<PcmBlock>;
}

/// How the samples of a WAV file map to `f32`.
enum SampleKind {
    Float,
    Int { scale: f32 },
}

/// Streaming WAV reader backed by `hound`.
///
/// Accepts 16/24/32-bit integer and 32-bit float PCM. The whole file is
/// never held in memory; blocks are decoded on demand.
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    kind: SampleKind,
    channels: usize,
    sample_rate: u32,
}

impl WavSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = WavReader::open(path.as_ref())
            .map_err(|e| StreamError::SourceRead(e.to_string()))?;
        let spec = reader.spec();
        let kind = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) => SampleKind::Float,
            (SampleFormat::Int, bits @ (16 | 24 | 32)) => SampleKind::Int {
                scale: 1.0 / (1i64 << (bits - 1)) as f32,
            },
            (format, bits) => {
                return Err(StreamError::SourceRead(format!(
                    "unsupported wav encoding: {bits}-bit {format:?}"
                )))
            }
        };
        Ok(Self {
            kind,
            channels: spec.channels as usize,
            sample_rate: spec.sample_rate,
            reader,
        })
    }

    /// Total frames declared by the file header.
    pub fn total_frames(&self) -> u64 {
        self.reader.duration() as u64
    }
}

impl AudioSource for WavSource {
    fn channels(&self) -> usize {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_block(&mut self, max_frames: usize) -> Result<PcmBlock> {
        let channels = self.channels;
        let mut planar: Vec<Vec<f32>> = vec![Vec::with_capacity(max_frames); channels];

        // Interleaved sample iterators borrow the reader, so each block
        // spins up a fresh one; hound resumes where the last left off.
        match self.kind {
            SampleKind::Float => {
                let mut samples = self.reader.samples::<f32>();
                'frames: for _ in 0..max_frames {
                    for (ch, lane) in planar.iter_mut().enumerate() {
                        match samples.next() {
                            Some(sample) => lane.push(
                                sample.map_err(|e| StreamError::SourceRead(e.to_string()))?,
                            ),
                            None if ch == 0 => break 'frames,
                            None => {
                                return Err(StreamError::SourceRead(
                                    "stream ended mid-frame".into(),
                                ))
                            }
                        }
                    }
                }
            }
            SampleKind::Int { scale } => {
                let mut samples = self.reader.samples::<i32>();
                'frames: for _ in 0..max_frames {
                    for (ch, lane) in planar.iter_mut().enumerate() {
                        match samples.next() {
                            Some(sample) => {
                                let s = sample
                                    .map_err(|e| StreamError::SourceRead(e.to_string()))?;
                                lane.push(s as f32 * scale);
                            }
                            None if ch == 0 => break 'frames,
                            None => {
                                return Err(StreamError::SourceRead(
                                    "stream ended mid-frame".into(),
                                ))
                            }
                        }
                    }
                }
            }
        }

        Ok(PcmBlock::from_planar(planar))
    }
}
