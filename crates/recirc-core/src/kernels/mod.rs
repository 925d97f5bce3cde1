//! Per-block DSP kernels, their persistent state, and the dispatch table.
//!
//! A kernel is a plain function. It reads one node's routed input, writes
//! every sample of every channel of that node's output, and updates the
//! node's [`NodeState`]. Kernels never allocate; any resizing happens when
//! the engine reconciles state with the graph between blocks.
//!
//! The engine looks kernels up in a [`KernelTable`], an array of function
//! pointers indexed by [`NodeKind`]. [`KernelTable::standard`] wires the
//! built-in kernels; [`KernelTable::with_kernel`] swaps one out.
//!
//! | Kind | Kernel | State |
//! |------|--------|-------|
//! | gain | [`gain::process`] | none |
//! | delay | [`delay::process`] | [`DelayState`] |
//! | biquad | [`biquad::process`] | [`BiquadState`] |
//! | oscillator | [`oscillator::process`] | [`OscillatorState`] |
//! | noise | [`noise::process`] | [`NoiseState`] |
//! | waveshaper | [`waveshaper::process`] | [`WaveshaperState`] |
//! | input/output mixer, passthrough | [`passthrough::process`] | none |

use core::fmt;

use crate::buffer::ChannelBuffer;
use crate::node_kind::NodeKind;
use crate::param_info::Params;

pub mod biquad;
pub mod delay;
pub mod gain;
pub mod noise;
pub mod oscillator;
pub mod passthrough;
pub mod waveshaper;

pub use biquad::BiquadState;
pub use delay::DelayState;
pub use noise::NoiseState;
pub use oscillator::OscillatorState;
pub use waveshaper::WaveshaperState;

/// Session constants a kernel needs besides its buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelContext {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Frames per block.
    pub block_size: usize,
    /// Active channel count.
    pub channels: usize,
}

/// Non-fatal failure reported by a kernel for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelFault {
    /// The node's state does not belong to its kind.
    StateMismatch {
        /// Kind the kernel expected.
        expected: NodeKind,
    },
    /// A recursive filter diverged. The bad sample was zeroed and the
    /// channel's memory reset; the rest of the block is valid.
    NumericInstability {
        /// First channel that diverged.
        channel: usize,
    },
    /// The kernel produced NaN or infinity. The output was discarded.
    NonFiniteOutput {
        /// First channel holding a non-finite sample.
        channel: usize,
    },
}

impl KernelFault {
    /// Returns `true` when the kernel's output was already sanitized and
    /// can be kept.
    pub fn output_is_usable(&self) -> bool {
        matches!(self, Self::NumericInstability { .. })
    }
}

impl fmt::Display for KernelFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateMismatch { expected } => write!(f, "state does not belong to a {expected} node"),
            Self::NumericInstability { channel } => {
                write!(f, "numeric instability on channel {channel}; filter memory reset")
            }
            Self::NonFiniteOutput { channel } => write!(f, "non-finite output on channel {channel}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for KernelFault {}

/// Signature shared by every kernel.
pub type Kernel = fn(
    input: &ChannelBuffer,
    output: &mut ChannelBuffer,
    params: &Params,
    state: &mut NodeState,
    ctx: &KernelContext,
) -> Result<(), KernelFault>;

/// Dispatch table from node kind to kernel.
#[derive(Clone, Copy)]
pub struct KernelTable {
    kernels: [Kernel; NodeKind::COUNT],
}

impl KernelTable {
    /// Table wired to the built-in kernels.
    pub fn standard() -> Self {
        let fallback: Kernel = passthrough::process;
        let mut kernels = [fallback; NodeKind::COUNT];
        kernels[NodeKind::Gain.index()] = gain::process;
        kernels[NodeKind::Delay.index()] = delay::process;
        kernels[NodeKind::Biquad.index()] = biquad::process;
        kernels[NodeKind::Oscillator.index()] = oscillator::process;
        kernels[NodeKind::Noise.index()] = noise::process;
        kernels[NodeKind::Waveshaper.index()] = waveshaper::process;
        Self { kernels }
    }

    /// Replaces the kernel for one kind.
    pub fn with_kernel(mut self, kind: NodeKind, kernel: Kernel) -> Self {
        self.kernels[kind.index()] = kernel;
        self
    }

    /// Kernel for a kind.
    #[inline]
    pub fn get(&self, kind: NodeKind) -> Kernel {
        self.kernels[kind.index()]
    }
}

impl Default for KernelTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for KernelTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelTable").finish_non_exhaustive()
    }
}

/// Settings used to build fresh node state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Channel count.
    pub channels: usize,
    /// Longest delay a delay node can hold, in seconds.
    pub max_delay_seconds: f32,
    /// Waveshaper transfer-curve length.
    pub curve_size: usize,
    /// Seed for nodes that draw random numbers.
    pub seed: u32,
}

/// Persistent per-node state, one variant per stateful kind.
#[derive(Debug, Clone)]
pub enum NodeState {
    /// Stateless kinds (gain, mixers).
    Stateless,
    /// Delay ring buffers.
    Delay(DelayState),
    /// Biquad coefficients and memory.
    Biquad(BiquadState),
    /// Oscillator phase.
    Oscillator(OscillatorState),
    /// Noise generator and color filters.
    Noise(NoiseState),
    /// Waveshaper curve cache.
    Waveshaper(WaveshaperState),
}

impl NodeState {
    /// Fresh state for a node of `kind`. Allocates.
    pub fn new(kind: NodeKind, config: &StateConfig) -> Self {
        match kind {
            NodeKind::Gain | NodeKind::InputMixer | NodeKind::OutputMixer | NodeKind::Passthrough => {
                Self::Stateless
            }
            NodeKind::Delay => Self::Delay(DelayState::new(config)),
            NodeKind::Biquad => Self::Biquad(BiquadState::new(config.channels)),
            NodeKind::Oscillator => Self::Oscillator(OscillatorState::default()),
            NodeKind::Noise => Self::Noise(NoiseState::new(config.channels, config.seed)),
            NodeKind::Waveshaper => Self::Waveshaper(WaveshaperState::new(config.channels, config.curve_size)),
        }
    }

    /// Returns `true` if this state can serve a node of `kind`.
    pub fn matches(&self, kind: NodeKind) -> bool {
        matches!(
            (self, kind),
            (
                Self::Stateless,
                NodeKind::Gain | NodeKind::InputMixer | NodeKind::OutputMixer | NodeKind::Passthrough
            )
                | (Self::Delay(_), NodeKind::Delay)
                | (Self::Biquad(_), NodeKind::Biquad)
                | (Self::Oscillator(_), NodeKind::Oscillator)
                | (Self::Noise(_), NodeKind::Noise)
                | (Self::Waveshaper(_), NodeKind::Waveshaper)
        )
    }

    /// Adapts per-channel state to a new channel count. Allocates.
    pub fn set_channels(&mut self, channels: usize) {
        match self {
            Self::Stateless | Self::Oscillator(_) => {}
            Self::Delay(s) => s.set_channels(channels),
            Self::Biquad(s) => s.set_channels(channels),
            Self::Noise(s) => s.set_channels(channels),
            Self::Waveshaper(s) => s.set_channels(channels),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub const SR: f32 = 48000.0;

    pub fn ctx(channels: usize, block_size: usize) -> KernelContext {
        KernelContext {
            sample_rate: SR,
            block_size,
            channels,
        }
    }

    pub fn state_config(channels: usize) -> StateConfig {
        StateConfig {
            sample_rate: SR,
            channels,
            max_delay_seconds: 1.0,
            curve_size: 1024,
            seed: 7,
        }
    }

    pub fn params(kind: NodeKind, values: &[(&str, f32)]) -> Params {
        let mut params = kind.default_params();
        for &(id, value) in values {
            let index = kind.param_index(id).unwrap();
            params.set(index, kind.params()[index].quantize(value));
        }
        params
    }

    pub fn impulse(channels: usize, block_size: usize) -> ChannelBuffer {
        let mut buf = ChannelBuffer::new(channels, block_size);
        for c in 0..channels {
            buf.channel_mut(c)[0] = 1.0;
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn broken(
        _input: &ChannelBuffer,
        output: &mut ChannelBuffer,
        _params: &Params,
        _state: &mut NodeState,
        _ctx: &KernelContext,
    ) -> Result<(), KernelFault> {
        output.as_mut_slice().fill(f32::NAN);
        Err(KernelFault::NonFiniteOutput { channel: 0 })
    }

    #[test]
    fn test_standard_table_dispatch() {
        let table = KernelTable::standard();
        let input = impulse(1, 8);
        let mut output = ChannelBuffer::new(1, 8);
        let mut state = NodeState::new(NodeKind::Gain, &state_config(1));
        let params = params(NodeKind::Gain, &[("gain", 0.5)]);
        table.get(NodeKind::Gain)(&input, &mut output, &params, &mut state, &ctx(1, 8)).unwrap();
        assert_eq!(output.channel(0)[0], 0.5);
    }

    #[test]
    fn test_with_kernel_overrides_one_slot() {
        let table = KernelTable::standard().with_kernel(NodeKind::Gain, broken);
        let input = impulse(1, 4);
        let mut output = ChannelBuffer::new(1, 4);
        let mut state = NodeState::Stateless;
        let params = NodeKind::Gain.default_params();
        assert!(table.get(NodeKind::Gain)(&input, &mut output, &params, &mut state, &ctx(1, 4)).is_err());
        // Other kinds untouched.
        table.get(NodeKind::OutputMixer)(&input, &mut output, &Params::defaults(&[]), &mut state, &ctx(1, 4))
            .unwrap();
        assert_eq!(output.channel(0), input.channel(0));
    }

    #[test]
    fn test_passthrough_kind_copies_input() {
        let table = KernelTable::standard();
        let input = impulse(2, 8);
        let mut output = ChannelBuffer::new(2, 8);
        let mut state = NodeState::new(NodeKind::Passthrough, &state_config(2));
        let params = NodeKind::Passthrough.default_params();
        table.get(NodeKind::Passthrough)(&input, &mut output, &params, &mut state, &ctx(2, 8)).unwrap();
        assert_eq!(output.channel(0), input.channel(0));
        assert_eq!(output.channel(1), input.channel(1));
    }

    #[test]
    fn test_state_matches_kind() {
        let config = state_config(2);
        for kind in NodeKind::ALL {
            let state = NodeState::new(kind, &config);
            assert!(state.matches(kind), "{kind}");
        }
        assert!(!NodeState::new(NodeKind::Delay, &config).matches(NodeKind::Biquad));
    }

    #[test]
    fn test_state_mismatch_is_reported() {
        let input = impulse(1, 4);
        let mut output = ChannelBuffer::new(1, 4);
        let mut state = NodeState::Stateless;
        let result = delay::process(
            &input,
            &mut output,
            &NodeKind::Delay.default_params(),
            &mut state,
            &ctx(1, 4),
        );
        assert_eq!(
            result,
            Err(KernelFault::StateMismatch {
                expected: NodeKind::Delay
            })
        );
    }
}
