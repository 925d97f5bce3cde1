//! Waveshaper kernel.
//!
//! A transfer curve of `curve_size` points spanning `[-1, 1]` is built from
//! `curveType` and `amount` and cached until either changes (the
//! `oversample` flag is part of the cache key). Per sample:
//!
//! ```text
//! x   = in * drive
//! idx = ((x + 1) / 2) * (N - 1), clamped to [0, N - 1]
//! out = (1 - mix) * in + mix * curve(idx)
//! ```
//!
//! With `oversample` set, the curve also runs on the midpoint between the
//! previous and current driven samples and the two results are averaged,
//! a cheap 2x scheme that softens aliasing on hard curves.
//!
//! | Curve | Shape at amount `a` |
//! |-------|---------------------|
//! | soft | `(1+k)x / (1+k|x|)`, `k = 100a` |
//! | hard | clip at `t = 1 - 0.99a`, rescaled by `1/t` |
//! | sin | `sin(x π/2 (1+4a))` |
//! | tanh | `tanh(x(1+9a)) / tanh(1+9a)` |
//! | atan | `atan(x(1+9a)) / atan(1+9a)` |
//! | clip | `clamp(x(1+9a), -1, 1)` |
//! | fold | `foldback(x(1+4a), 1)` |

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use core::f32::consts::FRAC_PI_2;
use libm::{atanf, sinf, tanhf};

use super::{KernelContext, KernelFault, NodeState};
use crate::buffer::ChannelBuffer;
use crate::math::{foldback, hard_clip, wet_dry_mix};
use crate::node_kind::NodeKind;
use crate::param_info::{ParamDescriptor, ParamScale, Params};

/// Slot of `curveType`.
pub const CURVE_TYPE: usize = 0;
/// Slot of `amount`.
pub const AMOUNT: usize = 1;
/// Slot of `drive`.
pub const DRIVE: usize = 2;
/// Slot of `mix`.
pub const MIX: usize = 3;
/// Slot of `oversample`.
pub const OVERSAMPLE: usize = 4;

/// Curve option names in slot order.
pub const CURVES: &[&str] = &["soft", "hard", "sin", "tanh", "atan", "clip", "fold"];

/// Parameter schema.
pub const PARAMS: &[ParamDescriptor] = &[
    ParamDescriptor::choice("Curve Type", "curveType", CURVES, 0),
    ParamDescriptor::float("Amount", "amount", 0.0, 1.0, 0.5),
    ParamDescriptor::float("Drive", "drive", 0.1, 10.0, 1.0).with_scale(ParamScale::Logarithmic),
    ParamDescriptor::float("Mix", "mix", 0.0, 1.0, 1.0),
    ParamDescriptor::toggle("Oversample", "oversample", false),
];

/// Evaluates curve `curve` at `x` for shaping amount `amount`.
pub fn transfer(curve: usize, amount: f32, x: f32) -> f32 {
    let a = amount.clamp(0.0, 1.0);
    match curve {
        1 => {
            let t = 1.0 - 0.99 * a;
            hard_clip(x, t) / t
        }
        2 => sinf(x * FRAC_PI_2 * (1.0 + 4.0 * a)),
        3 => {
            let k = 1.0 + 9.0 * a;
            tanhf(x * k) / tanhf(k)
        }
        4 => {
            let k = 1.0 + 9.0 * a;
            atanf(x * k) / atanf(k)
        }
        5 => hard_clip(x * (1.0 + 9.0 * a), 1.0),
        6 => foldback(x * (1.0 + 4.0 * a), 1.0),
        _ => {
            let k = a * 100.0;
            (1.0 + k) * x / (1.0 + k * x.abs())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CurveKey {
    curve: usize,
    amount: f32,
    oversample: bool,
}

/// Cached transfer curve plus per-channel oversampling memory.
#[derive(Debug, Clone)]
pub struct WaveshaperState {
    curve: Vec<f32>,
    key: Option<CurveKey>,
    previous: Vec<f32>,
}

impl WaveshaperState {
    /// Allocates a curve of `curve_size` points (at least 2).
    pub fn new(channels: usize, curve_size: usize) -> Self {
        Self {
            curve: vec![0.0; curve_size.max(2)],
            key: None,
            previous: vec![0.0; channels],
        }
    }

    /// Adds or drops per-channel memory.
    pub fn set_channels(&mut self, channels: usize) {
        self.previous.resize(channels, 0.0);
    }

    /// The cached curve.
    pub fn curve(&self) -> &[f32] {
        &self.curve
    }

    fn update(&mut self, curve: usize, amount: f32, oversample: bool) {
        let key = CurveKey {
            curve,
            amount,
            oversample,
        };
        if self.key == Some(key) {
            return;
        }
        let last = (self.curve.len() - 1) as f32;
        for (i, point) in self.curve.iter_mut().enumerate() {
            let x = i as f32 / last * 2.0 - 1.0;
            *point = transfer(curve, amount, x);
        }
        if !oversample {
            self.previous.fill(0.0);
        }
        self.key = Some(key);
    }

    #[inline]
    fn lookup(&self, x: f32) -> f32 {
        let last = self.curve.len() - 1;
        let pos = ((x + 1.0) * 0.5 * last as f32).clamp(0.0, last as f32);
        let i = pos as usize;
        if i >= last {
            return self.curve[last];
        }
        let frac = pos - i as f32;
        self.curve[i] + (self.curve[i + 1] - self.curve[i]) * frac
    }
}

/// Shapes every channel through the cached curve.
pub fn process(
    input: &ChannelBuffer,
    output: &mut ChannelBuffer,
    params: &Params,
    state: &mut NodeState,
    _ctx: &KernelContext,
) -> Result<(), KernelFault> {
    let NodeState::Waveshaper(state) = state else {
        return Err(KernelFault::StateMismatch {
            expected: NodeKind::Waveshaper,
        });
    };

    let oversample = params.get(OVERSAMPLE) >= 0.5;
    state.update(params.get(CURVE_TYPE) as usize, params.get(AMOUNT), oversample);
    let drive = params.get(DRIVE).max(0.0);
    let mix = params.get(MIX).clamp(0.0, 1.0);

    for ch in 0..output.channels().min(state.previous.len()) {
        let mut prev = state.previous[ch];
        for (y, &x) in output.channel_mut(ch).iter_mut().zip(input.channel(ch)) {
            let driven = x * drive;
            let shaped = if oversample {
                let mid = 0.5 * (prev + driven);
                0.5 * (state.lookup(mid) + state.lookup(driven))
            } else {
                state.lookup(driven)
            };
            prev = if driven.is_finite() { driven } else { 0.0 };
            *y = wet_dry_mix(x, shaped, mix);
        }
        state.previous[ch] = prev;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn shape_block(values: &[(&str, f32)], input: &[f32]) -> Vec<f32> {
        let mut state = NodeState::new(NodeKind::Waveshaper, &state_config(1));
        let params = params(NodeKind::Waveshaper, values);
        let mut inbuf = ChannelBuffer::new(1, input.len());
        inbuf.channel_mut(0).copy_from_slice(input);
        let mut output = ChannelBuffer::new(1, input.len());
        process(&inbuf, &mut output, &params, &mut state, &ctx(1, input.len())).unwrap();
        output.channel(0).to_vec()
    }

    #[test]
    fn test_curves_odd_and_bounded() {
        for curve in 0..CURVES.len() {
            for &amount in &[0.0, 0.5, 1.0] {
                for i in 0..=20 {
                    let x = i as f32 / 10.0 - 1.0;
                    let y = transfer(curve, amount, x);
                    assert!(y.abs() <= 1.0 + 1e-5, "{}({amount}) at {x} = {y}", CURVES[curve]);
                    let neg = transfer(curve, amount, -x);
                    assert!((y + neg).abs() < 1e-5, "{} not odd at {x}", CURVES[curve]);
                }
            }
        }
    }

    #[test]
    fn test_endpoints_hit_full_scale() {
        // Every curve except sin/fold maps ±1 to ±1.
        for curve in [0, 1, 3, 4, 5] {
            assert!((transfer(curve, 0.7, 1.0) - 1.0).abs() < 1e-5, "{}", CURVES[curve]);
        }
    }

    #[test]
    fn test_dry_mix_is_identity() {
        let input = [0.1, -0.4, 0.9, -1.0];
        let out = shape_block(&[("mix", 0.0), ("drive", 10.0)], &input);
        assert_eq!(out, input);
    }

    #[test]
    fn test_drive_saturates_through_clamped_index() {
        let out = shape_block(&[("curveType", 5.0), ("amount", 0.0), ("drive", 10.0)], &[0.5, -0.5, 3.0]);
        for (y, e) in out.iter().zip([1.0, -1.0, 1.0]) {
            assert!((y - e).abs() < 1e-3, "{y} vs {e}");
        }
    }

    #[test]
    fn test_curve_cache_tracks_oversample_flag() {
        let mut state = WaveshaperState::new(1, 64);
        state.update(0, 0.5, false);
        let key = state.key;
        state.update(0, 0.5, true);
        assert_ne!(state.key, key);
    }

    #[test]
    fn test_oversample_smooths_steps() {
        let input = [0.0, 0.0, 1.0, 1.0];
        let plain = shape_block(&[("curveType", 1.0), ("amount", 0.0)], &input);
        let over = shape_block(&[("curveType", 1.0), ("amount", 0.0), ("oversample", 1.0)], &input);
        assert!((plain[2] - 1.0).abs() < 1e-3);
        // Midpoint 0.5 averaged with 1.0.
        assert!((over[2] - 0.75).abs() < 1e-3, "{}", over[2]);
        assert!((over[3] - 1.0).abs() < 1e-3);
    }
}
