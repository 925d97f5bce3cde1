//! Feedback delay kernel.
//!
//! Per channel, per sample:
//!
//! ```text
//! delayed = line.read(round(delayTime * sr))
//! out     = (1 - mix) * in + mix * delayed
//! line.write(in + delayed * feedback)
//! ```

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use super::{KernelContext, KernelFault, NodeState, StateConfig};
use crate::buffer::ChannelBuffer;
use crate::delay::DelayLine;
use crate::math::flush_denormal;
use crate::node_kind::NodeKind;
use crate::param_info::{ParamDescriptor, Params};

/// Slot of `delayTime` (seconds).
pub const DELAY_TIME: usize = 0;
/// Slot of `feedback`.
pub const FEEDBACK: usize = 1;
/// Slot of `mix`.
pub const MIX: usize = 2;

/// Parameter schema.
pub const PARAMS: &[ParamDescriptor] = &[
    ParamDescriptor::float("Delay Time", "delayTime", 0.0, 5.0, 0.3).with_step(0.001),
    ParamDescriptor::float("Feedback", "feedback", 0.0, 1.0, 0.3),
    ParamDescriptor::float("Mix", "mix", 0.0, 1.0, 0.5),
];

/// One ring buffer per channel.
#[derive(Debug, Clone)]
pub struct DelayState {
    lines: Vec<DelayLine>,
    template: DelayLine,
}

impl DelayState {
    /// Allocates `config.channels` lines of `config.max_delay_seconds`.
    pub fn new(config: &StateConfig) -> Self {
        let template = DelayLine::from_time(config.sample_rate, config.max_delay_seconds);
        Self {
            lines: (0..config.channels).map(|_| template.clone()).collect(),
            template,
        }
    }

    /// Adds silent lines or drops trailing ones.
    pub fn set_channels(&mut self, channels: usize) {
        self.lines.resize(channels, self.template.clone());
    }

    /// Per-channel lines.
    pub fn lines(&self) -> &[DelayLine] {
        &self.lines
    }
}

/// Runs the delay recurrence on every channel.
pub fn process(
    input: &ChannelBuffer,
    output: &mut ChannelBuffer,
    params: &Params,
    state: &mut NodeState,
    ctx: &KernelContext,
) -> Result<(), KernelFault> {
    let NodeState::Delay(state) = state else {
        return Err(KernelFault::StateMismatch {
            expected: NodeKind::Delay,
        });
    };

    let feedback = params.get(FEEDBACK).clamp(0.0, 1.0);
    let mix = params.get(MIX).clamp(0.0, 1.0);
    let dry = 1.0 - mix;

    for (ch, line) in state.lines.iter_mut().enumerate().take(output.channels()) {
        let delay = line.delay_samples(params.get(DELAY_TIME), ctx.sample_rate);
        let out = output.channel_mut(ch);
        for (y, &x) in out.iter_mut().zip(input.channel(ch)) {
            let delayed = line.read(delay);
            *y = dry * x + mix * delayed;
            line.write(flush_denormal(x + delayed * feedback));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_impulse_lands_across_blocks() {
        let block = 64;
        let mut state = NodeState::new(NodeKind::Delay, &state_config(1));
        let params = params(
            NodeKind::Delay,
            &[("delayTime", 100.0 / SR), ("feedback", 0.0), ("mix", 1.0)],
        );
        let mut heard = Vec::new();
        for b in 0..4 {
            let input = if b == 0 { impulse(1, block) } else { ChannelBuffer::new(1, block) };
            let mut output = ChannelBuffer::new(1, block);
            process(&input, &mut output, &params, &mut state, &ctx(1, block)).unwrap();
            heard.extend(
                output
                    .channel(0)
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| **s != 0.0)
                    .map(|(i, s)| (b * block + i, *s)),
            );
        }
        assert_eq!(heard, vec![(100, 1.0)]);
    }

    #[test]
    fn test_feedback_repeats_decay() {
        let block = 32;
        let mut state = NodeState::new(NodeKind::Delay, &state_config(1));
        let params = params(
            NodeKind::Delay,
            &[("delayTime", 10.0 / SR), ("feedback", 0.5), ("mix", 1.0)],
        );
        let mut output = ChannelBuffer::new(1, block);
        process(&impulse(1, block), &mut output, &params, &mut state, &ctx(1, block)).unwrap();
        let out = output.channel(0);
        assert_eq!(out[10], 1.0);
        assert_eq!(out[20], 0.5);
        assert_eq!(out[30], 0.25);
    }

    #[test]
    fn test_dry_mix_passes_input() {
        let mut state = NodeState::new(NodeKind::Delay, &state_config(2));
        let params = params(NodeKind::Delay, &[("mix", 0.0)]);
        let input = impulse(2, 8);
        let mut output = ChannelBuffer::new(2, 8);
        process(&input, &mut output, &params, &mut state, &ctx(2, 8)).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_zero_delay_time_clamps_to_one_sample() {
        let mut state = NodeState::new(NodeKind::Delay, &state_config(1));
        let params = params(NodeKind::Delay, &[("delayTime", 0.0), ("feedback", 0.0), ("mix", 1.0)]);
        let mut output = ChannelBuffer::new(1, 4);
        process(&impulse(1, 4), &mut output, &params, &mut state, &ctx(1, 4)).unwrap();
        assert_eq!(output.channel(0), &[0.0, 1.0, 0.0, 0.0]);
    }
}
