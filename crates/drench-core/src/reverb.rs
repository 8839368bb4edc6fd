//! Freeverb-topology reverb unit.
//!
//! Eight damped feedback comb filters in parallel feed four series allpass
//! diffusers per channel. The right channel runs slightly longer delay lines
//! for stereo spread. Parameter mapping (room size and damping scale factors,
//! fixed input gain, freeze behavior) follows the common Freeverb tuning so
//! the unit sounds like the reverbs people already know.

use crate::block::PcmBlock;
use crate::effect::AudioEffect;
use crate::error::{EffectError, Result};

/// Classic comb delay lengths, in samples at 44.1 kHz.
const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass delay lengths, in samples at 44.1 kHz.
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];

/// Extra delay on the right channel's filters.
const STEREO_SPREAD: usize = 23;

const ALLPASS_FEEDBACK: f32 = 0.5;
const FIXED_GAIN: f32 = 0.015;
const ROOM_SCALE: f32 = 0.28;
const ROOM_OFFSET: f32 = 0.7;
const DAMP_SCALE: f32 = 0.4;
const WET_SCALE: f32 = 3.0;
const DRY_SCALE: f32 = 2.0;

/// Reverb parameters, all in `[0.0, 1.0]`.
///
/// Immutable for the lifetime of a [`ReverbUnit`]; construct a new unit to
/// change them. Values outside the range are clamped at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbParams {
    /// Room size: 0.1 is a closet, 0.9 an auditorium.
    pub room_size: f32,
    /// High-frequency absorption of the decay.
    pub damping: f32,
    /// Level of the processed signal in the output.
    pub wet_level: f32,
    /// Level of the unprocessed signal in the output.
    pub dry_level: f32,
    /// Stereo width of the wet signal: 0 collapses to mono.
    pub width: f32,
    /// At 0.5 and above the tank feeds back forever and ignores new input.
    pub freeze_mode: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.33,
            dry_level: 0.4,
            width: 1.0,
            freeze_mode: 0.0,
        }
    }
}

impl ReverbParams {
    fn clamped(self) -> Self {
        Self {
            room_size: self.room_size.clamp(0.0, 1.0),
            damping: self.damping.clamp(0.0, 1.0),
            wet_level: self.wet_level.clamp(0.0, 1.0),
            dry_level: self.dry_level.clamp(0.0, 1.0),
            width: self.width.clamp(0.0, 1.0),
            freeze_mode: self.freeze_mode.clamp(0.0, 1.0),
        }
    }

    fn frozen(&self) -> bool {
        self.freeze_mode >= 0.5
    }

    /// Comb feedback. Pinned to 1.0 while frozen so the tank rings forever.
    fn comb_feedback(&self) -> f32 {
        if self.frozen() {
            1.0
        } else {
            ROOM_OFFSET + ROOM_SCALE * self.room_size
        }
    }

    fn comb_damp(&self) -> f32 {
        if self.frozen() {
            0.0
        } else {
            DAMP_SCALE * self.damping
        }
    }

    /// Gain applied to input before it enters the tank. Zero while frozen.
    fn input_gain(&self) -> f32 {
        if self.frozen() {
            0.0
        } else {
            FIXED_GAIN
        }
    }
}

/// Comb filter with a one-pole lowpass in the feedback path.
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
    filter_store: f32,
    damp1: f32,
    damp2: f32,
}

impl CombFilter {
    fn new(delay_samples: usize, feedback: f32, damp: f32) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            index: 0,
            feedback,
            filter_store: 0.0,
            damp1: damp,
            damp2: 1.0 - damp,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.filter_store = output * self.damp2 + self.filter_store * self.damp1;
        self.buffer[self.index] = input + self.filter_store * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_store = 0.0;
        self.index = 0;
    }
}

/// Allpass diffuser.
struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
}

impl AllpassFilter {
    fn new(delay_samples: usize, feedback: f32) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            index: 0,
            feedback,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.index];
        let output = buffered - input;
        self.buffer[self.index] = input + buffered * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
    }
}

/// One channel's filter bank: combs in parallel, allpasses in series.
struct ChannelTank {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl ChannelTank {
    fn new(params: &ReverbParams, sample_rate: f64, spread: usize) -> Self {
        let scale = sample_rate / 44_100.0;
        let combs = COMB_TUNINGS
            .iter()
            .map(|&t| {
                let delay = ((t + spread) as f64 * scale).round() as usize;
                CombFilter::new(delay, params.comb_feedback(), params.comb_damp())
            })
            .collect();
        let allpasses = ALLPASS_TUNINGS
            .iter()
            .map(|&t| {
                let delay = ((t + spread) as f64 * scale).round() as usize;
                AllpassFilter::new(delay, ALLPASS_FEEDBACK)
            })
            .collect();
        Self { combs, allpasses }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.process(input);
        }
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        out
    }

    fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.reset();
        }
        for allpass in &mut self.allpasses {
            allpass.reset();
        }
    }
}

/// Stateful Freeverb reverb for mono or stereo streams.
///
/// The channel layout is fixed by the first processed block; the delay-line
/// state then persists across every following block until [`reset`] is
/// called, so silence fed in after the input ends keeps producing the
/// ringing tail.
///
/// [`reset`]: AudioEffect::reset
pub struct ReverbUnit {
    params: ReverbParams,
    sample_rate: f64,
    tanks: Vec<ChannelTank>,
    wet1: f32,
    wet2: f32,
    dry_gain: f32,
}

impl ReverbUnit {
    pub fn new(params: ReverbParams) -> Self {
        let params = params.clamped();
        let wet = params.wet_level * WET_SCALE;
        Self {
            params,
            sample_rate: 44_100.0,
            tanks: Vec::new(),
            wet1: wet * (params.width / 2.0 + 0.5),
            wet2: wet * ((1.0 - params.width) / 2.0),
            dry_gain: params.dry_level * DRY_SCALE,
        }
    }

    pub fn params(&self) -> &ReverbParams {
        &self.params
    }

    fn build_tanks(&mut self, channels: usize) -> Result<()> {
        if channels == 0 || channels > 2 {
            return Err(EffectError::ChannelLayout(channels));
        }
        self.tanks = (0..channels)
            .map(|ch| ChannelTank::new(&self.params, self.sample_rate, ch * STEREO_SPREAD))
            .collect();
        Ok(())
    }

    fn process_mono(&mut self, block: &mut PcmBlock) {
        let gain = self.params.input_gain();
        let tank = &mut self.tanks[0];
        for sample in block.channel_mut(0) {
            let dry = *sample;
            let wet = tank.process(dry * gain);
            *sample = dry * self.dry_gain + wet * self.wet1;
        }
    }

    fn process_stereo(&mut self, block: &mut PcmBlock) {
        let gain = self.params.input_gain();
        let frames = block.frames();
        let (wet1, wet2, dry_gain) = (self.wet1, self.wet2, self.dry_gain);
        for i in 0..frames {
            let dry_l = block.channel(0)[i];
            let dry_r = block.channel(1)[i];
            // Both tanks hear the same mixed-down input; the stereo image
            // comes from the spread delay lengths and the wet1/wet2 mix.
            let input = (dry_l + dry_r) * gain;
            let wet_l = self.tanks[0].process(input);
            let wet_r = self.tanks[1].process(input);
            block.channel_mut(0)[i] = dry_l * dry_gain + wet_l * wet1 + wet_r * wet2;
            block.channel_mut(1)[i] = dry_r * dry_gain + wet_r * wet1 + wet_l * wet2;
        }
    }
}

impl AudioEffect for ReverbUnit {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        if sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            // Delay lengths depend on the rate; drop the banks so the next
            // block rebuilds them.
            self.tanks.clear();
        }
    }

    fn process(&mut self, block: &mut PcmBlock) -> Result<()> {
        if self.tanks.is_empty() {
            self.build_tanks(block.channels())?;
        } else if block.channels() != self.tanks.len() {
            return Err(EffectError::ShapeChanged {
                expected: self.tanks.len(),
                got: block.channels(),
            });
        }
        match self.tanks.len() {
            1 => self.process_mono(block),
            _ => self.process_stereo(block),
        }
        Ok(())
    }

    fn reset(&mut self) {
        for tank in &mut self.tanks {
            tank.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn impulse_block(frames: usize, channels: usize) -> PcmBlock {
        let mut block = PcmBlock::silence(frames, channels);
        for ch in 0..channels {
            block.channel_mut(ch)[0] = 1.0;
        }
        block
    }

    #[test]
    fn comb_filter_is_silent_until_the_delay_elapses() {
        let mut comb = CombFilter::new(100, 0.5, 0.5);
        for _ in 0..100 {
            assert_abs_diff_eq!(comb.process(1.0), 0.0);
        }
        // The buffer has wrapped; output now carries the delayed input.
        assert_abs_diff_eq!(comb.process(1.0), 1.0);
    }

    #[test]
    fn allpass_filter_inverts_until_the_delay_elapses() {
        let mut allpass = AllpassFilter::new(50, ALLPASS_FEEDBACK);
        for _ in 0..50 {
            assert_abs_diff_eq!(allpass.process(1.0), -1.0);
        }
        assert_abs_diff_eq!(allpass.process(1.0), 0.0);
    }

    #[test]
    fn params_are_clamped() {
        let unit = ReverbUnit::new(ReverbParams {
            room_size: 2.0,
            damping: -1.0,
            ..Default::default()
        });
        assert_eq!(unit.params().room_size, 1.0);
        assert_eq!(unit.params().damping, 0.0);
    }

    #[test]
    fn dry_only_is_exact_passthrough() {
        // dry 0.5 * dry scale 2.0 gives unity gain on the dry path.
        let mut unit = ReverbUnit::new(ReverbParams {
            wet_level: 0.0,
            dry_level: 0.5,
            ..Default::default()
        });
        unit.set_sample_rate(44_100.0);

        let mut block = PcmBlock::from_planar(vec![vec![0.25, -0.5, 1.0], vec![0.0, 0.75, -1.0]]);
        let original = block.clone();
        unit.process(&mut block).unwrap();
        assert_eq!(block, original);
    }

    #[test]
    fn wet_only_rings_after_warmup() {
        let mut unit = ReverbUnit::new(ReverbParams {
            wet_level: 1.0,
            dry_level: 0.0,
            ..Default::default()
        });
        unit.set_sample_rate(44_100.0);

        let mut block = impulse_block(4096, 2);
        unit.process(&mut block).unwrap();
        assert!(block.peak() > 0.0, "expected wet output after warmup");
    }

    #[test]
    fn tail_decays_below_audible_floor() {
        let mut unit = ReverbUnit::new(ReverbParams::default());
        unit.set_sample_rate(44_100.0);

        let mut block = impulse_block(1024, 2);
        unit.process(&mut block).unwrap();

        let mut last_peak = f32::MAX;
        for round in 0..2048 {
            let mut silence = PcmBlock::silence(1024, 2);
            unit.process(&mut silence).unwrap();
            let peak = silence.peak();
            if peak < 1e-4 {
                assert!(round > 0, "tail should ring for at least one block");
                return;
            }
            last_peak = last_peak.min(peak);
        }
        panic!("tail never fell below the floor, last peak {last_peak}");
    }

    #[test]
    fn frozen_tank_does_not_decay() {
        let mut unit = ReverbUnit::new(ReverbParams {
            freeze_mode: 1.0,
            wet_level: 1.0,
            dry_level: 0.0,
            ..Default::default()
        });
        unit.set_sample_rate(44_100.0);

        // Freeze mutes new input: an empty frozen tank stays silent.
        let mut silence = PcmBlock::silence(2048, 2);
        unit.process(&mut silence).unwrap();
        assert_eq!(silence.peak(), 0.0);

        // A thawed unit seeded with an impulse decays block over block,
        // which the frozen unity feedback would not allow.
        let mut thawed = ReverbUnit::new(ReverbParams {
            wet_level: 1.0,
            dry_level: 0.0,
            ..Default::default()
        });
        thawed.set_sample_rate(44_100.0);
        let mut block = impulse_block(4096, 2);
        thawed.process(&mut block).unwrap();
        let first = block.peak();
        for _ in 0..32 {
            block = PcmBlock::silence(4096, 2);
            thawed.process(&mut block).unwrap();
        }
        assert!(block.peak() < first, "thawed tail must decay");
    }

    #[test]
    fn mono_blocks_are_supported() {
        let mut unit = ReverbUnit::new(ReverbParams::default());
        unit.set_sample_rate(48_000.0);

        let mut block = impulse_block(512, 1);
        assert!(unit.process(&mut block).is_ok());
    }

    #[test]
    fn more_than_two_channels_is_rejected() {
        let mut unit = ReverbUnit::new(ReverbParams::default());
        let mut block = PcmBlock::silence(64, 3);
        assert!(matches!(
            unit.process(&mut block),
            Err(EffectError::ChannelLayout(3))
        ));
    }

    #[test]
    fn channel_layout_is_fixed_by_first_block() {
        let mut unit = ReverbUnit::new(ReverbParams::default());
        let mut stereo = PcmBlock::silence(64, 2);
        unit.process(&mut stereo).unwrap();

        let mut mono = PcmBlock::silence(64, 1);
        assert!(matches!(
            unit.process(&mut mono),
            Err(EffectError::ShapeChanged {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn reset_clears_the_tail() {
        let mut unit = ReverbUnit::new(ReverbParams::default());
        unit.set_sample_rate(44_100.0);

        let mut block = impulse_block(2048, 2);
        unit.process(&mut block).unwrap();
        unit.reset();

        let mut silence = PcmBlock::silence(2048, 2);
        unit.process(&mut silence).unwrap();
        assert_eq!(silence.peak(), 0.0);
    }
}
