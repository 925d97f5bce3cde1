//! Noise kernel: white, pink or brown, scaled by `gain`.
//!
//! - **White**: i.i.d. uniform samples in `[-1, 1]`.
//! - **Pink**: Paul Kellet's economy filter, three one-pole sections summed
//!   with a direct white term, approximating a -3 dB/octave slope.
//! - **Brown**: leaky integrator `b = 0.98 b + 0.02 w`, scaled by 3.5 to sit
//!   near the other colors' level.
//!
//! Every channel draws its own white samples, so channels are decorrelated.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use super::{KernelContext, KernelFault, NodeState};
use crate::buffer::ChannelBuffer;
use crate::math::{flush_denormal, hard_clip};
use crate::node_kind::NodeKind;
use crate::param_info::{ParamDescriptor, Params};
use crate::rng::XorShift32;

/// Slot of `noiseType`.
pub const NOISE_TYPE: usize = 0;
/// Slot of `gain`.
pub const GAIN: usize = 1;

/// Color option names in slot order.
pub const COLORS: &[&str] = &["white", "pink", "brown"];

/// Parameter schema.
pub const PARAMS: &[ParamDescriptor] = &[
    ParamDescriptor::choice("Noise Type", "noiseType", COLORS, 0),
    ParamDescriptor::float("Gain", "gain", 0.0, 1.0, 0.5),
];

const PINK_SCALE: f32 = 0.25;
const BROWN_LEAK: f32 = 0.98;
const BROWN_SCALE: f32 = 3.5;

#[derive(Debug, Clone, Copy, Default)]
struct ColorFilter {
    b0: f32,
    b1: f32,
    b2: f32,
    brown: f32,
}

impl ColorFilter {
    #[inline]
    fn pink(&mut self, white: f32) -> f32 {
        self.b0 = flush_denormal(0.99765 * self.b0 + white * 0.099_046);
        self.b1 = flush_denormal(0.963 * self.b1 + white * 0.296_516_4);
        self.b2 = flush_denormal(0.57 * self.b2 + white * 1.052_691_3);
        hard_clip((self.b0 + self.b1 + self.b2 + white * 0.1848) * PINK_SCALE, 1.0)
    }

    #[inline]
    fn brown(&mut self, white: f32) -> f32 {
        self.brown = flush_denormal(BROWN_LEAK * self.brown + (1.0 - BROWN_LEAK) * white);
        hard_clip(self.brown * BROWN_SCALE, 1.0)
    }
}

/// Random generator plus per-channel color filter memory.
#[derive(Debug, Clone)]
pub struct NoiseState {
    rng: XorShift32,
    filters: Vec<ColorFilter>,
}

impl NoiseState {
    /// Creates state for `channels` channels seeded with `seed`.
    pub fn new(channels: usize, seed: u32) -> Self {
        Self {
            rng: XorShift32::new(seed),
            filters: (0..channels).map(|_| ColorFilter::default()).collect(),
        }
    }

    /// Adds or drops per-channel filters.
    pub fn set_channels(&mut self, channels: usize) {
        self.filters.resize(channels, ColorFilter::default());
    }
}

/// Fills every channel with noise of the selected color.
pub fn process(
    _input: &ChannelBuffer,
    output: &mut ChannelBuffer,
    params: &Params,
    state: &mut NodeState,
    _ctx: &KernelContext,
) -> Result<(), KernelFault> {
    let NodeState::Noise(state) = state else {
        return Err(KernelFault::StateMismatch {
            expected: NodeKind::Noise,
        });
    };

    let color = params.get(NOISE_TYPE) as usize;
    let gain = params.get(GAIN).clamp(0.0, 1.0);
    let rng = &mut state.rng;

    for (ch, filter) in state.filters.iter_mut().enumerate().take(output.channels()) {
        for y in output.channel_mut(ch) {
            let white = rng.next_bipolar();
            let sample = match color {
                1 => filter.pink(white),
                2 => filter.brown(white),
                _ => white,
            };
            *y = sample * gain;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::math::rms;

    fn render(color: f32, channels: usize, blocks: usize) -> ChannelBuffer {
        let block = 512;
        let mut state = NodeState::new(NodeKind::Noise, &state_config(channels));
        let params = params(NodeKind::Noise, &[("noiseType", color), ("gain", 1.0)]);
        let mut output = ChannelBuffer::new(channels, block);
        for _ in 0..blocks {
            process(&ChannelBuffer::new(channels, block), &mut output, &params, &mut state, &ctx(channels, block))
                .unwrap();
        }
        output
    }

    /// Mean absolute first difference; lower means more low-frequency energy.
    fn roughness(block: &[f32]) -> f32 {
        block.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f32>() / (block.len() - 1) as f32
    }

    #[test]
    fn test_every_color_bounded_and_alive() {
        for color in 0..COLORS.len() {
            let out = render(color as f32, 2, 8);
            assert!(out.as_slice().iter().all(|s| (-1.0..=1.0).contains(s)), "{}", COLORS[color]);
            assert!(rms(out.channel(0)) > 0.01, "{} is silent", COLORS[color]);
        }
    }

    #[test]
    fn test_colors_darken() {
        let white = render(0.0, 1, 8);
        let pink = render(1.0, 1, 8);
        let brown = render(2.0, 1, 8);
        let w = roughness(white.channel(0)) / rms(white.channel(0));
        let p = roughness(pink.channel(0)) / rms(pink.channel(0));
        let b = roughness(brown.channel(0)) / rms(brown.channel(0));
        assert!(w > p && p > b, "white {w}, pink {p}, brown {b}");
    }

    #[test]
    fn test_channels_decorrelated() {
        let out = render(0.0, 2, 1);
        assert_ne!(out.channel(0), out.channel(1));
    }

    #[test]
    fn test_zero_gain_is_silent() {
        let mut state = NodeState::new(NodeKind::Noise, &state_config(1));
        let params = params(NodeKind::Noise, &[("gain", 0.0)]);
        let mut output = ChannelBuffer::new(1, 32);
        process(&ChannelBuffer::new(1, 32), &mut output, &params, &mut state, &ctx(1, 32)).unwrap();
        assert!(output.as_slice().iter().all(|s| *s == 0.0));
    }
}
