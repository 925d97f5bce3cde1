//! Passthrough kernel shared by `input_mixer`, `output_mixer` and `passthrough`.
//!
//! The mixers differ only in how the engine treats them: an input mixer's
//! input also receives the host input, and output mixers are summed into the
//! host output.

use super::{KernelContext, KernelFault, NodeState};
use crate::buffer::ChannelBuffer;
use crate::param_info::Params;

/// Copies input to output.
pub fn process(
    input: &ChannelBuffer,
    output: &mut ChannelBuffer,
    _params: &Params,
    _state: &mut NodeState,
    _ctx: &KernelContext,
) -> Result<(), KernelFault> {
    output.copy_from(input);
    Ok(())
}
