//! Trimming and playback-rate shifting.

use rubato::{FftFixedIn, Resampler};
use tracing::debug;

use crate::error::{PrepError, Result};

/// Resampler chunk size. One sub-chunk keeps latency irrelevant for an
/// offline pass while staying fast.
const CHUNK_SIZE: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Cut the stream down to the `[start, end)` second range, in place.
///
/// `None` bounds leave that side untouched; both bounds are clamped to the
/// stream length. An empty or inverted range is an error.
pub fn trim_seconds(
    channels: &mut [Vec<f32>],
    sample_rate: u32,
    start: Option<f64>,
    end: Option<f64>,
) -> Result<()> {
    let frames = channels.first().map_or(0, Vec::len);
    let start_s = start.unwrap_or(0.0).max(0.0);
    let end_s = end.unwrap_or(f64::INFINITY);
    if start_s >= end_s {
        return Err(PrepError::InvalidRange {
            start: start_s,
            end: end_s,
        });
    }

    let start_frame = ((start_s * sample_rate as f64) as usize).min(frames);
    let end_frame = if end_s.is_finite() {
        ((end_s * sample_rate as f64) as usize).min(frames)
    } else {
        frames
    };

    for channel in channels.iter_mut() {
        channel.truncate(end_frame);
        channel.drain(..start_frame.min(end_frame));
    }

    debug!(
        start_frame,
        end_frame,
        kept = end_frame.saturating_sub(start_frame),
        "trimmed input"
    );
    Ok(())
}

/// Playback-rate change by frame-rate reinterpretation.
///
/// Pretends the audio was recorded at `sample_rate * speed` and resamples
/// it back to `sample_rate`, keeping the nominal rate label. For
/// `speed < 1` the result is longer and pitched down - the classic
/// slowed-record sound, deliberately not pitch-preserving.
pub fn shift_speed(
    channels: &[Vec<f32>],
    sample_rate: u32,
    speed: f64,
) -> Result<Vec<Vec<f32>>> {
    if !(0.05..=20.0).contains(&speed) {
        return Err(PrepError::Resample(format!(
            "speed factor {speed} out of range"
        )));
    }
    if (speed - 1.0).abs() < f64::EPSILON {
        return Ok(channels.to_vec());
    }

    let n_channels = channels.len();
    let input_frames = channels.first().map_or(0, Vec::len);
    let virtual_rate = (sample_rate as f64 * speed).round() as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        virtual_rate,
        sample_rate as usize,
        CHUNK_SIZE,
        SUB_CHUNKS,
        n_channels,
    )?;

    let expected_output =
        (input_frames as f64 * sample_rate as f64 / virtual_rate as f64).ceil() as usize;
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected_output + CHUNK_SIZE); n_channels];

    let mut pos = 0;
    while pos < input_frames {
        let needed = resampler.input_frames_next();
        // The final chunk is zero-padded up to what the resampler wants;
        // the surplus output is truncated away below.
        let mut chunk: Vec<Vec<f32>> = vec![vec![0.0; needed]; n_channels];
        let available = (input_frames - pos).min(needed);
        for (lane, channel) in chunk.iter_mut().zip(channels.iter()) {
            lane[..available].copy_from_slice(&channel[pos..pos + available]);
        }

        let resampled = resampler.process(&chunk, None)?;
        for (lane, out) in resampled.into_iter().zip(output.iter_mut()) {
            out.extend_from_slice(&lane);
        }
        pos += needed;
    }

    for lane in output.iter_mut() {
        lane.truncate(expected_output);
    }

    debug!(
        input_frames,
        output_frames = expected_output,
        speed,
        "shifted playback rate"
    );
    Ok(output)
}
