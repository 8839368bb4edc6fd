//! drench - slow a song down and drench it in reverb.
//!
//! One-shot batch tool: decodes the input, optionally trims and retimes
//! it, streams it through the reverb with full tail capture, and writes a
//! WAV next to you. All knobs default to the classic slowed-and-reverb
//! treatment.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use drench::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "drench")]
#[command(about = "Slow a song down and drench it in reverb")]
#[command(version)]
struct Args {
    /// Input audio file (.wav, or .mp3 with the mp3 feature)
    input: PathBuf,

    /// Output file; defaults to <input-basename>_w_reverb.wav
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Start of the kept range, in seconds
    #[arg(long)]
    start: Option<f64>,

    /// End of the kept range, in seconds
    #[arg(long)]
    end: Option<f64>,

    /// Playback-rate factor; below 1 slows and lowers the song
    #[arg(long, default_value_t = 0.82)]
    speed: f64,

    /// Frames per streamed block
    #[arg(long, default_value_t = 16_384)]
    block_size: usize,

    /// Amplitude below which the reverb tail counts as silent
    #[arg(long, default_value_t = 1e-4)]
    noise_floor: f32,

    /// Upper bound on tail blocks before the run fails
    #[arg(long, default_value_t = 8_192)]
    max_tail_blocks: usize,

    /// Room size: 0.1 is a closet, 0.9 an auditorium
    #[arg(long, default_value_t = 0.7)]
    room_size: f32,

    /// High-frequency damping of the decay
    #[arg(long, default_value_t = 0.7)]
    damping: f32,

    /// Wet (processed) level
    #[arg(long, default_value_t = 0.33)]
    wet: f32,

    /// Dry (unprocessed) level
    #[arg(long, default_value_t = 0.8)]
    dry: f32,

    /// Stereo width of the wet signal
    #[arg(long, default_value_t = 0.5)]
    width: f32,

    /// Freeze mode; at 0.5 and above the tank rings forever
    #[arg(long, default_value_t = 0.0)]
    freeze: f32,

    /// Keep the intermediate trimmed/retimed file around
    #[arg(long)]
    keep_intermediate: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut pipeline = RemixPipeline::new(&args.input)
        .speed(args.speed)
        .block_size(args.block_size)
        .noise_floor(args.noise_floor)
        .max_tail_blocks(args.max_tail_blocks)
        .reverb(ReverbParams {
            room_size: args.room_size,
            damping: args.damping,
            wet_level: args.wet,
            dry_level: args.dry,
            width: args.width,
            freeze_mode: args.freeze,
        });

    if let Some(output) = args.output {
        pipeline = pipeline.output(output);
    }
    if args.start.is_some() || args.end.is_some() {
        pipeline = pipeline.trim(
            args.start.unwrap_or(0.0),
            args.end.unwrap_or(f64::INFINITY),
        );
    }
    if args.keep_intermediate {
        pipeline = pipeline.cleanup(CleanupPolicy::Never);
    }

    let report = pipeline.run(&CancelToken::new())?;

    match report.summary.outcome {
        Outcome::Completed => eprintln!("Generated file {}", report.output.display()),
        Outcome::Cancelled => eprintln!(
            "Cancelled; partial file {} retained",
            report.output.display()
        ),
    }
    Ok(())
}
