//! Oscillator kernel.
//!
//! A single phase accumulator (`phase += frequency / sample_rate`, wrapped
//! to `[0, 1)`) drives every channel with the same waveform, scaled by
//! `gain`. The routed input is ignored.

use core::f32::consts::TAU;
use libm::{floorf, sinf};

use super::{KernelContext, KernelFault, NodeState};
use crate::buffer::ChannelBuffer;
use crate::node_kind::NodeKind;
use crate::param_info::{ParamDescriptor, ParamScale, Params};

/// Slot of `waveform`.
pub const WAVEFORM: usize = 0;
/// Slot of `frequency` (Hz).
pub const FREQUENCY: usize = 1;
/// Slot of `gain`.
pub const GAIN: usize = 2;

/// Waveform option names in slot order.
pub const WAVEFORMS: &[&str] = &["sine", "square", "sawtooth", "triangle"];

/// Parameter schema.
pub const PARAMS: &[ParamDescriptor] = &[
    ParamDescriptor::choice("Waveform", "waveform", WAVEFORMS, 0),
    ParamDescriptor::float("Frequency", "frequency", 0.1, 20000.0, 440.0)
        .with_scale(ParamScale::Logarithmic)
        .with_step(0.1),
    ParamDescriptor::float("Gain", "gain", 0.0, 1.0, 0.5),
];

/// Phase in `[0, 1)`.
#[derive(Debug, Clone, Default)]
pub struct OscillatorState {
    phase: f32,
}

impl OscillatorState {
    /// Current phase.
    pub fn phase(&self) -> f32 {
        self.phase
    }
}

#[inline]
fn shape(waveform: usize, phase: f32) -> f32 {
    match waveform {
        1 => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        2 => 2.0 * phase - 1.0,
        3 => {
            if phase < 0.5 {
                4.0 * phase - 1.0
            } else {
                3.0 - 4.0 * phase
            }
        }
        _ => sinf(phase * TAU),
    }
}

/// Writes the waveform to every channel.
pub fn process(
    _input: &ChannelBuffer,
    output: &mut ChannelBuffer,
    params: &Params,
    state: &mut NodeState,
    ctx: &KernelContext,
) -> Result<(), KernelFault> {
    let NodeState::Oscillator(state) = state else {
        return Err(KernelFault::StateMismatch {
            expected: NodeKind::Oscillator,
        });
    };

    let waveform = params.get(WAVEFORM) as usize;
    let gain = params.get(GAIN).clamp(0.0, 1.0);
    let increment = params.get(FREQUENCY).max(0.0) / ctx.sample_rate;
    let increment = if increment.is_finite() { increment } else { 0.0 };
    let block = output.block_size();
    if output.channels() == 0 || block == 0 {
        state.phase = advance(state.phase, increment * block as f32);
        return Ok(());
    }

    let mut phase = state.phase;
    for y in output.channel_mut(0) {
        *y = shape(waveform, phase) * gain;
        phase = advance(phase, increment);
    }
    state.phase = phase;

    let (first, rest) = output.as_mut_slice().split_at_mut(block);
    for chunk in rest.chunks_exact_mut(block) {
        chunk.copy_from_slice(first);
    }
    Ok(())
}

#[inline]
fn advance(phase: f32, delta: f32) -> f32 {
    let next = phase + delta;
    if next >= 1.0 { next - floorf(next) } else { next }
}
