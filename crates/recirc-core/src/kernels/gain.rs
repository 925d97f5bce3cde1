//! Gain kernel: `out = in * clamp(gain, 0, 2)`.

use super::{KernelContext, KernelFault, NodeState};
use crate::buffer::ChannelBuffer;
use crate::param_info::{ParamDescriptor, Params};

/// Slot of the `gain` parameter.
pub const GAIN: usize = 0;

/// Parameter schema.
pub const PARAMS: &[ParamDescriptor] = &[ParamDescriptor::float("Gain", "gain", 0.0, 2.0, 1.0)];

/// Scales every channel by the gain parameter.
pub fn process(
    input: &ChannelBuffer,
    output: &mut ChannelBuffer,
    params: &Params,
    _state: &mut NodeState,
    _ctx: &KernelContext,
) -> Result<(), KernelFault> {
    let gain = params.get(GAIN).clamp(0.0, 2.0);
    for (out, &x) in output.as_mut_slice().iter_mut().zip(input.as_slice()) {
        *out = x * gain;
    }
    Ok(())
}
