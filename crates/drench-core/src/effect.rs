//! Stateful block-effect contract.

use crate::block::PcmBlock;
use crate::error::Result;

/// A stateful audio effect that transforms fixed-shape blocks in place.
///
/// Implementations carry internal state (delay lines, filter memories)
/// across consecutive [`process`](AudioEffect::process) calls. That
/// continuity is what callers rely on to collect a decay tail by feeding
/// silence after the input ends, so a driver must never call
/// [`reset`](AudioEffect::reset) between blocks of the same stream.
///
/// Parameters are fixed at construction; the only mutable inputs during a
/// stream are the sample blocks themselves.
pub trait AudioEffect: Send {
    /// Set the sample rate. Called once before processing starts.
    fn set_sample_rate(&mut self, sample_rate: f64);

    /// Process one block in place.
    ///
    /// The block keeps its exact shape (frame and channel count). The first
    /// call fixes the channel layout for the lifetime of the effect
    /// instance; later calls with a different layout are an error.
    fn process(&mut self, block: &mut PcmBlock) -> Result<()>;

    /// Clear all internal state.
    ///
    /// Never called between blocks of one stream - doing so would cut the
    /// decay tail off mid-ring.
    fn reset(&mut self);
}
