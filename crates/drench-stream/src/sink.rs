//! Sequential block-oriented PCM writers.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use drench_core::PcmBlock;
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::{Result, StreamError};

/// Sequential block writer over a PCM stream.
///
/// Accepts any block whose channel count matches the stream's; the frame
/// count may vary call to call (the final dry block of a stream is usually
/// short). Implementations must release their resources on drop so an
/// aborted session never leaks a file handle; `finalize` is the success
/// path that also patches up headers.
pub trait AudioSink {
    /// Append one block to the stream, all channels, in order.
    ///
    /// Errors must be reported as [`StreamError::SinkWrite`].
    fn write_block(&mut self, block: &PcmBlock) -> Result<()>;

    /// Flush and close the stream. Called once, after the last block.
    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

/// WAV writer backed by `hound`, writing 16-bit integer PCM.
///
/// Samples are clamped to `[-1.0, 1.0]` before quantization. Dropping an
/// unfinalized sink still closes the file (hound patches the header on a
/// best-effort basis), so partial output survives an aborted run.
pub struct WavSink {
    writer: Option<WavWriter<BufWriter<File>>>,
    channels: usize,
}

impl WavSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32, channels: usize) -> Result<Self> {
        let spec = WavSpec {
            channels: channels as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path.as_ref(), spec)
            .map_err(|e| StreamError::SinkWrite(e.to_string()))?;
        Ok(Self {
            writer: Some(writer),
            channels,
        })
    }
}

#[inline]
fn quantize_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

impl AudioSink for WavSink {
    fn write_block(&mut self, block: &PcmBlock) -> Result<()> {
        if block.channels() != self.channels {
            return Err(StreamError::SinkWrite(format!(
                "channel count mismatch: sink has {}, block has {}",
                self.channels,
                block.channels()
            )));
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| StreamError::SinkWrite("sink already finalized".into()))?;
        for i in 0..block.frames() {
            for ch in 0..block.channels() {
                writer
                    .write_sample(quantize_i16(block.channel(ch)[i]))
                    .map_err(|e| StreamError::SinkWrite(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| StreamError::SinkWrite(e.to_string()))?;
        }
        Ok(())
    }
}
