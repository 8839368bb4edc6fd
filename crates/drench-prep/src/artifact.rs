//! Intermediate-file lifecycle.
//!
//! The trimmed/retimed audio is written to a temporary WAV which the
//! streaming stage then reads block by block. What happens to that file
//! afterwards is a [`CleanupPolicy`]: the historical behavior is to remove
//! it only when the whole run succeeds, leaving it behind on failure for
//! inspection.

use std::fs;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::debug;

use crate::error::Result;

/// When the intermediate file is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Remove once the downstream stage completes successfully; keep it
    /// around on failure.
    #[default]
    OnSuccess,
    /// Remove on success and failure alike.
    Always,
    /// Never remove; useful when debugging the preprocessing itself.
    Never,
}

/// A trimmed/retimed float32 WAV on disk, owned until handed off.
///
/// Call [`finish`](IntermediateFile::finish) on the success path. If the
/// file is instead dropped (failure somewhere downstream), only the
/// [`CleanupPolicy::Always`] policy removes it.
#[derive(Debug)]
pub struct IntermediateFile {
    path: PathBuf,
    policy: CleanupPolicy,
    removed: bool,
}

impl IntermediateFile {
    /// Write planar samples as a 32-bit float WAV at `path`.
    pub fn write(
        path: impl AsRef<Path>,
        channels: &[Vec<f32>],
        sample_rate: u32,
        policy: CleanupPolicy,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let spec = WavSpec {
            channels: channels.len() as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec)?;
        let frames = channels.first().map_or(0, Vec::len);
        for i in 0..frames {
            for channel in channels {
                writer.write_sample(channel[i])?;
            }
        }
        writer.finalize()?;

        debug!(path = %path.display(), frames, "wrote intermediate file");
        Ok(Self {
            path,
            policy,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Success-path handoff: removes the file unless the policy says keep.
    pub fn finish(mut self) -> Result<()> {
        if self.policy != CleanupPolicy::Never {
            fs::remove_file(&self.path)?;
            self.removed = true;
        }
        Ok(())
    }
}

impl Drop for IntermediateFile {
    fn drop(&mut self) {
        if !self.removed && self.policy == CleanupPolicy::Always {
            let _ = fs::remove_file(&self.path);
        }
    }
}
