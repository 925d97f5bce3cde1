//! Global modulation: two LFOs, two envelope followers and the chaos scalar.
//!
//! Settings ([`GlobalModulation`]) live in the graph and are edited by the
//! control plane. Runtime generator state ([`ModulationBank`]) lives in the
//! engine and is evaluated once per block:
//!
//! 1. [`ModulationBank::begin_block`] reads each LFO at its current phase
//!    and advances it by one block, and feeds each envelope follower the
//!    previous block's output of its source node.
//! 2. [`ModulationBank::resolve`] combines the per-parameter slots into an
//!    effective value for every modulated parameter.
//!
//! # Combination
//!
//! ```text
//! source value = generator * global amount        (0 when disabled)
//! offset       = (1 + chaos) * Σ(source value * slot amount) + jitter
//! jitter       = chaos² * 0.1 * uniform(-1, 1)    (only with an active slot)
//! ```
//!
//! Linear parameters add the offset in native units. Logarithmic parameters
//! add it in normalized log space. Discrete parameters are re-quantized.

use crate::buffer::ChannelBuffer;
use crate::envelope::EnvelopeFollower;
use crate::graph::NodeId;
use crate::lfo::{Lfo, LfoWaveform};
use crate::param_info::{MAX_PARAMS, ParamDescriptor, ParamScale, Params};
use crate::rng::XorShift32;

/// Number of modulation sources.
pub const SOURCE_COUNT: usize = 4;

/// A global modulation generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModSource {
    /// First LFO.
    Lfo1,
    /// Second LFO.
    Lfo2,
    /// First envelope follower.
    Env1,
    /// Second envelope follower.
    Env2,
}

impl ModSource {
    /// Every source in slot order.
    pub const ALL: [Self; SOURCE_COUNT] = [Self::Lfo1, Self::Lfo2, Self::Env1, Self::Env2];

    /// Slot index.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name (`"lfo1"`, `"env2"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lfo1 => "lfo1",
            Self::Lfo2 => "lfo2",
            Self::Env1 => "env1",
            Self::Env2 => "env2",
        }
    }

    /// Parses a wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str().eq_ignore_ascii_case(name))
    }
}

/// One source's contribution to one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModSlot {
    /// Whether the slot contributes.
    pub enabled: bool,
    /// Signed depth.
    pub amount: f32,
}

impl ModSlot {
    /// An enabled slot with the given depth.
    pub fn new(amount: f32) -> Self {
        Self {
            enabled: true,
            amount,
        }
    }
}

/// The four source slots attached to one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParamModulation {
    /// Slots indexed by [`ModSource::index`].
    pub slots: [ModSlot; SOURCE_COUNT],
}

impl ParamModulation {
    /// Returns `true` if any slot is enabled with a non-zero depth.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.slots.iter().any(|s| s.enabled && s.amount != 0.0)
    }

    /// Slot for one source.
    pub fn slot(&self, source: ModSource) -> ModSlot {
        self.slots[source.index()]
    }

    /// Replaces one source's slot. Non-finite depths become zero.
    pub fn set_slot(&mut self, source: ModSource, slot: ModSlot) {
        let amount = if slot.amount.is_finite() { slot.amount } else { 0.0 };
        self.slots[source.index()] = ModSlot { amount, ..slot };
    }
}

/// Settings for one global LFO.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoSettings {
    /// Whether the LFO contributes.
    pub enabled: bool,
    /// Rate in Hz (> 0).
    pub frequency: f32,
    /// Waveform.
    pub waveform: LfoWaveform,
    /// Global depth in `[0, 1]`.
    pub amount: f32,
}

impl Default for LfoSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency: 1.0,
            waveform: LfoWaveform::Sine,
            amount: 1.0,
        }
    }
}

impl LfoSettings {
    /// Lowest accepted rate.
    pub const MIN_FREQUENCY: f32 = 0.001;
    /// Highest accepted rate.
    pub const MAX_FREQUENCY: f32 = 100.0;

    /// Clamps every field into range, replacing non-finite values.
    pub fn sanitized(self) -> Self {
        Self {
            frequency: finite_or(self.frequency, 1.0).clamp(Self::MIN_FREQUENCY, Self::MAX_FREQUENCY),
            amount: finite_or(self.amount, 0.0).clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Settings for one envelope follower.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSettings {
    /// Whether the follower contributes.
    pub enabled: bool,
    /// Attack time in seconds (> 0).
    pub attack: f32,
    /// Release time in seconds (> 0).
    pub release: f32,
    /// Global depth in `[0, 1]`.
    pub amount: f32,
    /// Node whose output is tracked.
    pub source: Option<NodeId>,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            attack: 0.01,
            release: 0.1,
            amount: 1.0,
            source: None,
        }
    }
}

impl EnvelopeSettings {
    /// Shortest accepted attack or release.
    pub const MIN_TIME: f32 = 0.0001;
    /// Longest accepted attack or release.
    pub const MAX_TIME: f32 = 10.0;

    /// Clamps every field into range, replacing non-finite values.
    pub fn sanitized(self) -> Self {
        Self {
            attack: finite_or(self.attack, 0.01).clamp(Self::MIN_TIME, Self::MAX_TIME),
            release: finite_or(self.release, 0.1).clamp(Self::MIN_TIME, Self::MAX_TIME),
            amount: finite_or(self.amount, 0.0).clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Graph-wide modulation settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlobalModulation {
    /// `lfo1`, `lfo2`.
    pub lfos: [LfoSettings; 2],
    /// `env1`, `env2`.
    pub envelopes: [EnvelopeSettings; 2],
    /// Chaos in `[0, 1]`.
    pub chaos_level: f32,
}

impl GlobalModulation {
    /// Clamps every field into range.
    pub fn sanitized(self) -> Self {
        Self {
            lfos: self.lfos.map(LfoSettings::sanitized),
            envelopes: self.envelopes.map(EnvelopeSettings::sanitized),
            chaos_level: finite_or(self.chaos_level, 0.0).clamp(0.0, 1.0),
        }
    }
}

#[inline]
fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

/// Runtime generator state and this block's source values.
#[derive(Debug, Clone)]
pub struct ModulationBank {
    lfos: [Lfo; 2],
    followers: [EnvelopeFollower; 2],
    rng: XorShift32,
    values: [f32; SOURCE_COUNT],
    sample_rate: f32,
}

impl ModulationBank {
    /// Creates generators at rest. `seed` drives held-random LFOs and chaos.
    pub fn new(sample_rate: f32, seed: u32) -> Self {
        let defaults = EnvelopeSettings::default();
        let follower = EnvelopeFollower::new(sample_rate, defaults.attack, defaults.release);
        Self {
            lfos: [Lfo::new(seed ^ 0x9E37_79B9), Lfo::new(seed ^ 0x7F4A_7C15)],
            followers: [follower.clone(), follower],
            rng: XorShift32::new(seed),
            values: [0.0; SOURCE_COUNT],
            sample_rate,
        }
    }

    /// This block's value for one source, already scaled by its global amount.
    #[inline]
    pub fn value(&self, source: ModSource) -> f32 {
        self.values[source.index()]
    }

    /// Samples every generator for the coming block.
    ///
    /// `env_inputs[i]` is the previous-block output of envelope `i`'s source
    /// node, or `None` when it has no source.
    pub fn begin_block(
        &mut self,
        settings: &GlobalModulation,
        env_inputs: [Option<&ChannelBuffer>; 2],
        block_size: usize,
    ) {
        for (i, (lfo, cfg)) in self.lfos.iter_mut().zip(&settings.lfos).enumerate() {
            let value = lfo.value(cfg.waveform);
            lfo.advance(cfg.frequency, self.sample_rate, block_size);
            self.values[i] = if cfg.enabled { value * cfg.amount } else { 0.0 };
        }

        for (i, (follower, cfg)) in self.followers.iter_mut().zip(&settings.envelopes).enumerate() {
            follower.set_times(cfg.attack, cfg.release);
            match env_inputs[i] {
                Some(buffer) => {
                    for frame in 0..buffer.block_size() {
                        follower.process(buffer.frame_peak(frame));
                    }
                }
                None => {
                    for _ in 0..block_size {
                        follower.process(0.0);
                    }
                }
            }
            self.values[2 + i] = if cfg.enabled {
                follower.level() * cfg.amount
            } else {
                0.0
            };
        }
    }

    /// Effective value of one parameter for this block.
    pub fn resolve(
        &mut self,
        desc: &ParamDescriptor,
        base: f32,
        modulation: &ParamModulation,
        chaos_level: f32,
    ) -> f32 {
        if !modulation.is_active() {
            return base;
        }

        let sum: f32 = modulation
            .slots
            .iter()
            .zip(&self.values)
            .filter(|(slot, _)| slot.enabled)
            .map(|(slot, value)| slot.amount * value)
            .sum();
        let chaos = chaos_level.clamp(0.0, 1.0);
        let mut offset = (1.0 + chaos) * sum;
        if chaos > 0.0 {
            offset += chaos * chaos * 0.1 * self.rng.next_bipolar();
        }

        let value = match desc.scale {
            ParamScale::Linear => base + offset,
            ParamScale::Logarithmic => desc.denormalize((desc.normalize(base) + offset).clamp(0.0, 1.0)),
        };
        desc.quantize(value)
    }

    /// Resolves every parameter of a node into a scratch block.
    pub fn resolve_params(
        &mut self,
        schema: &[ParamDescriptor],
        base: &Params,
        modulation: &[ParamModulation; MAX_PARAMS],
        chaos_level: f32,
    ) -> Params {
        let mut resolved = *base;
        for (i, desc) in schema.iter().enumerate() {
            resolved.set(i, self.resolve(desc, base.get(i), &modulation[i], chaos_level));
        }
        resolved
    }
}
