//! Biquad filter kernel.
//!
//! Coefficients are cached and redesigned only when the filter type,
//! frequency, Q, gain, sample rate or channel count changes. A diverging
//! channel is reset sample-locally (see [`Biquad::process_guarded`]) and the
//! block is reported as [`KernelFault::NumericInstability`] once complete.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use super::{KernelContext, KernelFault, NodeState};
use crate::biquad::{Biquad, BiquadCoefficients, FilterType};
use crate::buffer::ChannelBuffer;
use crate::node_kind::NodeKind;
use crate::param_info::{ParamDescriptor, ParamScale, Params};

/// Slot of `filterType`.
pub const FILTER_TYPE: usize = 0;
/// Slot of `frequency` (Hz).
pub const FREQUENCY: usize = 1;
/// Slot of `Q`.
pub const Q: usize = 2;
/// Slot of `gain` (dB).
pub const GAIN: usize = 3;

/// Parameter schema.
pub const PARAMS: &[ParamDescriptor] = &[
    ParamDescriptor::choice("Filter Type", "filterType", FilterType::NAMES, 0),
    ParamDescriptor::float("Frequency", "frequency", 20.0, 20000.0, 1000.0)
        .with_scale(ParamScale::Logarithmic)
        .with_step(1.0),
    ParamDescriptor::float("Q", "Q", 0.1, 30.0, 0.707).with_scale(ParamScale::Logarithmic),
    ParamDescriptor::float("Gain", "gain", -24.0, 24.0, 0.0).with_step(0.1),
];

#[derive(Debug, Clone, Copy, PartialEq)]
struct DesignKey {
    filter: FilterType,
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,
    channels: usize,
}

/// Per-channel filters sharing one coefficient set.
#[derive(Debug, Clone)]
pub struct BiquadState {
    filters: Vec<Biquad>,
    key: Option<DesignKey>,
}

impl BiquadState {
    /// Passthrough filters for `channels` channels.
    pub fn new(channels: usize) -> Self {
        Self {
            filters: (0..channels).map(|_| Biquad::new()).collect(),
            key: None,
        }
    }

    /// Adds or drops channels. New channels pick up the current coefficients.
    pub fn set_channels(&mut self, channels: usize) {
        let coeffs = self
            .filters
            .first()
            .map_or(BiquadCoefficients::PASSTHROUGH, Biquad::coefficients);
        self.filters.resize(channels, Biquad::with_coefficients(coeffs));
    }

    /// Coefficients in use.
    pub fn coefficients(&self) -> Option<BiquadCoefficients> {
        self.filters.first().map(Biquad::coefficients)
    }

    /// Per-channel filters.
    pub fn filters(&self) -> &[Biquad] {
        &self.filters
    }

    fn update(&mut self, params: &Params, ctx: &KernelContext) {
        let key = DesignKey {
            filter: FilterType::from_index(params.get(FILTER_TYPE) as usize),
            frequency: params.get(FREQUENCY),
            q: params.get(Q),
            gain_db: params.get(GAIN),
            sample_rate: ctx.sample_rate,
            channels: self.filters.len(),
        };
        if self.key == Some(key) {
            return;
        }
        // Designs above Nyquist fold back; keep the cutoff just below it.
        let frequency = key.frequency.min(0.49 * key.sample_rate);
        let coeffs = BiquadCoefficients::design(key.filter, frequency, key.q, key.gain_db, key.sample_rate);
        for filter in &mut self.filters {
            filter.set_coefficients(coeffs);
        }
        self.key = Some(key);
    }
}

/// Filters every channel through its own Direct Form I memory.
pub fn process(
    input: &ChannelBuffer,
    output: &mut ChannelBuffer,
    params: &Params,
    state: &mut NodeState,
    ctx: &KernelContext,
) -> Result<(), KernelFault> {
    let NodeState::Biquad(state) = state else {
        return Err(KernelFault::StateMismatch {
            expected: NodeKind::Biquad,
        });
    };
    state.update(params, ctx);

    let mut unstable = None;
    for (ch, filter) in state.filters.iter_mut().enumerate().take(output.channels()) {
        for (y, &x) in output.channel_mut(ch).iter_mut().zip(input.channel(ch)) {
            *y = match filter.process_guarded(x) {
                Some(v) => v,
                None => {
                    unstable.get_or_insert(ch);
                    0.0
                }
            };
        }
    }

    match unstable {
        Some(channel) => Err(KernelFault::NumericInstability { channel }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_lowpass_dc_converges() {
        let block = 128;
        let mut state = NodeState::new(NodeKind::Biquad, &state_config(1));
        let params = params(NodeKind::Biquad, &[("frequency", 1000.0)]);
        let mut input = ChannelBuffer::new(1, block);
        input.channel_mut(0).fill(1.0);
        let mut output = ChannelBuffer::new(1, block);
        for _ in 0..20 {
            process(&input, &mut output, &params, &mut state, &ctx(1, block)).unwrap();
        }
        let last = output.channel(0)[block - 1];
        assert!((last - 1.0).abs() < 0.01, "DC settled at {last}");
    }

    #[test]
    fn test_coefficients_cached_until_params_change() {
        let mut state = NodeState::new(NodeKind::Biquad, &state_config(1));
        let input = impulse(1, 16);
        let mut output = ChannelBuffer::new(1, 16);
        let p1 = params(NodeKind::Biquad, &[("frequency", 500.0)]);
        process(&input, &mut output, &p1, &mut state, &ctx(1, 16)).unwrap();
        let NodeState::Biquad(s) = &state else { unreachable!() };
        let first = s.coefficients().unwrap();

        process(&input, &mut output, &p1, &mut state, &ctx(1, 16)).unwrap();
        let NodeState::Biquad(s) = &state else { unreachable!() };
        assert_eq!(s.coefficients().unwrap(), first);

        let p2 = params(NodeKind::Biquad, &[("frequency", 5000.0)]);
        process(&input, &mut output, &p2, &mut state, &ctx(1, 16)).unwrap();
        let NodeState::Biquad(s) = &state else { unreachable!() };
        assert_ne!(s.coefficients().unwrap(), first);
    }

    #[test]
    fn test_degenerate_coefficients_reset_memory() {
        let block = 256;
        let mut state = NodeState::new(NodeKind::Biquad, &state_config(2));
        let params = NodeKind::Biquad.default_params();
        let mut input = ChannelBuffer::new(2, block);
        input.as_mut_slice().fill(1.0);
        let mut output = ChannelBuffer::new(2, block);
        process(&input, &mut output, &params, &mut state, &ctx(2, block)).unwrap();

        // Force a divergent recurrence while keeping the cache key valid.
        let NodeState::Biquad(s) = &mut state else { unreachable!() };
        s.filters[1].set_coefficients(BiquadCoefficients {
            b0: 1.0e30,
            b1: 1.0e30,
            b2: 1.0e30,
            a1: -1.0e30,
            a2: 1.0e30,
        });

        let result = process(&input, &mut output, &params, &mut state, &ctx(2, block));
        assert_eq!(result, Err(KernelFault::NumericInstability { channel: 1 }));
        assert!(output.as_slice().iter().all(|s| s.is_finite()));
        assert!(output.channel(1).contains(&0.0));

        let NodeState::Biquad(s) = &state else { unreachable!() };
        assert!(s.filters()[0].memory().iter().all(|v| v.is_finite()));
        assert!(s.filters()[1].memory().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_new_channels_inherit_coefficients() {
        let mut state = BiquadState::new(1);
        let ctx = ctx(1, 8);
        state.update(&params(NodeKind::Biquad, &[("filterType", 1.0)]), &ctx);
        state.set_channels(3);
        let c = state.filters()[0].coefficients();
        assert!(state.filters().iter().all(|f| f.coefficients() == c));
    }
}
