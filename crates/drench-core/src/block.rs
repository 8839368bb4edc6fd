//! Planar PCM block buffer.

/// A block of `frames x channels` float samples.
///
/// Samples are stored planar - one `Vec<f32>` per channel, all of equal
/// length - with values nominally in `[-1.0, 1.0]`. Channel count and frame
/// count are fixed at construction; effects transform blocks in place so the
/// shape never changes between a read and the matching write.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBlock {
    frames: usize,
    channels: Vec<Vec<f32>>,
}

impl PcmBlock {
    /// Create an all-zero block of the given shape.
    pub fn silence(frames: usize, channels: usize) -> Self {
        Self {
            frames,
            channels: vec![vec![0.0; frames]; channels],
        }
    }

    /// Build a block from planar channel data.
    ///
    /// # Panics
    ///
    /// Panics if the channel vectors have different lengths or if no
    /// channels are given.
    pub fn from_planar(channels: Vec<Vec<f32>>) -> Self {
        assert!(!channels.is_empty(), "block needs at least one channel");
        let frames = channels[0].len();
        assert!(
            channels.iter().all(|c| c.len() == frames),
            "all channels must have the same length"
        );
        Self { frames, channels }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// True when the block holds no frames (end-of-stream marker).
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Samples of one channel.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Mutable samples of one channel.
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    /// Maximum absolute sample value across all channels.
    ///
    /// Returns `0.0` for an empty block.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .map(|s| s.abs())
            .fold(0.0f32, f32::max)
    }
}
