//! Core DSP building blocks for the drench pipeline.
//!
//! This crate provides:
//! - [`PcmBlock`] - the planar `frames x channels` sample buffer every stage
//!   exchanges
//! - [`AudioEffect`] - the stateful block-effect contract the streaming stage
//!   drives
//! - [`ReverbUnit`] - a Freeverb-topology reverb implementing that contract
//!
//! Effects are configured once at construction via immutable parameter values
//! ([`ReverbParams`]) and carry their internal state across consecutive
//! `process` calls, which is what lets a caller pump silence through them to
//! collect a decay tail.

pub mod block;
pub mod effect;
pub mod error;
pub mod reverb;

pub use block::PcmBlock;
pub use effect::AudioEffect;
pub use error::{EffectError, Result};
pub use reverb::{ReverbParams, ReverbUnit};
