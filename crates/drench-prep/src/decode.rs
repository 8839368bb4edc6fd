//! Input decoding to planar float samples.

use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::debug;

use crate::error::{PrepError, Result};

/// A fully decoded input: planar channels of `f32` plus the native rate.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// One `Vec<f32>` per channel, all the same length.
    pub channels: Vec<Vec<f32>>,
    /// Native sample rate in Hz.
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Frames per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Decode an input file, dispatching on the extension.
///
/// `.wav` is always supported; `.mp3` needs the `mp3` feature. Anything
/// else fails with [`PrepError::UnsupportedFileType`] before any data is
/// read.
pub fn decode_file(path: impl AsRef<Path>) -> Result<DecodedAudio> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let decoded = match extension.as_str() {
        "wav" => decode_wav(path)?,
        #[cfg(feature = "mp3")]
        "mp3" => decode_compressed(path)?,
        _ => return Err(PrepError::UnsupportedFileType(path.display().to_string())),
    };

    debug!(
        path = %path.display(),
        frames = decoded.frames(),
        channels = decoded.channels.len(),
        sample_rate = decoded.sample_rate,
        "decoded input"
    );
    Ok(decoded)
}

fn decode_wav(path: &Path) -> Result<DecodedAudio> {
    let mut reader = WavReader::open(path).map_err(|e| PrepError::Decode(e.to_string()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    let mut planar: Vec<Vec<f32>> =
        vec![Vec::with_capacity(reader.duration() as usize); channels];

    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => {
            for (i, sample) in reader.samples::<f32>().enumerate() {
                let s = sample.map_err(|e| PrepError::Decode(e.to_string()))?;
                planar[i % channels].push(s);
            }
        }
        (SampleFormat::Int, bits @ (16 | 24 | 32)) => {
            let scale = 1.0 / (1i64 << (bits - 1)) as f32;
            for (i, sample) in reader.samples::<i32>().enumerate() {
                let s = sample.map_err(|e| PrepError::Decode(e.to_string()))?;
                planar[i % channels].push(s as f32 * scale);
            }
        }
        (format, bits) => {
            return Err(PrepError::Decode(format!(
                "unsupported wav encoding: {bits}-bit {format:?}"
            )))
        }
    }

    Ok(DecodedAudio {
        channels: planar,
        sample_rate: spec.sample_rate,
    })
}

/// Decode a compressed file through symphonia's probe-and-decode loop.
#[cfg(feature = "mp3")]
fn decode_compressed(path: &Path) -> Result<DecodedAudio> {
    use std::fs::File;
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::DecoderOptions;
    use symphonia::core::errors::Error as SymphoniaError;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PrepError::Decode(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| PrepError::Decode("no audio track found".into()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.unwrap_or(44_100);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| PrepError::Decode(e.to_string()))?;

    let mut planar: Vec<Vec<f32>> = vec![Vec::new(); channels];
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(PrepError::Decode(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Recoverable per the symphonia contract: skip the bad packet.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(PrepError::Decode(e.to_string())),
        };

        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec())
        });
        buf.copy_interleaved_ref(decoded);
        for (i, &sample) in buf.samples().iter().enumerate() {
            planar[i % channels].push(sample);
        }
    }

    Ok(DecodedAudio {
        channels: planar,
        sample_rate,
    })
}
