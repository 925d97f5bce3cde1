//! The closed set of node types and their parameter schemas.

use core::fmt;
use core::str::FromStr;

use crate::kernels;
use crate::param_info::{ParamDescriptor, Params};

/// Node type. Indexes the kernel table and selects the parameter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Scales input by a linear gain.
    Gain,
    /// Feedback delay line with wet/dry mix.
    Delay,
    /// Second-order RBJ filter.
    Biquad,
    /// Phase-accumulator tone generator.
    Oscillator,
    /// White, pink or brown noise generator.
    Noise,
    /// Table-driven nonlinear transfer curve.
    Waveshaper,
    /// Passthrough that also receives the host input.
    InputMixer,
    /// Passthrough whose output feeds the host output.
    OutputMixer,
    /// Plain passthrough. Node types the engine does not recognize run as
    /// this kind.
    Passthrough,
}

impl NodeKind {
    /// Number of kinds.
    pub const COUNT: usize = 9;

    /// Every kind in table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Gain,
        Self::Delay,
        Self::Biquad,
        Self::Oscillator,
        Self::Noise,
        Self::Waveshaper,
        Self::InputMixer,
        Self::OutputMixer,
        Self::Passthrough,
    ];

    /// Position in [`ALL`](Self::ALL).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name (`"gain"`, `"input_mixer"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gain => "gain",
            Self::Delay => "delay",
            Self::Biquad => "biquad",
            Self::Oscillator => "oscillator",
            Self::Noise => "noise",
            Self::Waveshaper => "waveshaper",
            Self::InputMixer => "input_mixer",
            Self::OutputMixer => "output_mixer",
            Self::Passthrough => "passthrough",
        }
    }

    /// One-line description for catalogs.
    pub fn description(self) -> &'static str {
        match self {
            Self::Gain => "Linear gain stage",
            Self::Delay => "Feedback delay line, up to the engine's maximum delay",
            Self::Biquad => "RBJ cookbook biquad filter (8 responses)",
            Self::Oscillator => "Sine/square/sawtooth/triangle oscillator",
            Self::Noise => "White, pink or brown noise",
            Self::Waveshaper => "Waveshaping distortion with drive and mix",
            Self::InputMixer => "Passthrough that adds the host input",
            Self::OutputMixer => "Passthrough summed into the host output",
            Self::Passthrough => "Copies input to output; stands in for unrecognized types",
        }
    }

    /// Parameter schema. Slot `i` of a node's [`Params`] holds descriptor `i`.
    pub fn params(self) -> &'static [ParamDescriptor] {
        match self {
            Self::Gain => kernels::gain::PARAMS,
            Self::Delay => kernels::delay::PARAMS,
            Self::Biquad => kernels::biquad::PARAMS,
            Self::Oscillator => kernels::oscillator::PARAMS,
            Self::Noise => kernels::noise::PARAMS,
            Self::Waveshaper => kernels::waveshaper::PARAMS,
            Self::InputMixer | Self::OutputMixer | Self::Passthrough => &[],
        }
    }

    /// Slot index of a parameter by its wire id.
    pub fn param_index(self, string_id: &str) -> Option<usize> {
        self.params().iter().position(|d| d.string_id == string_id)
    }

    /// Parameter block holding every default.
    pub fn default_params(self) -> Params {
        Params::defaults(self.params())
    }

    /// Kind for a wire type name. Unrecognized names map to
    /// [`Passthrough`](Self::Passthrough).
    pub fn from_name_or_passthrough(name: &str) -> Self {
        name.parse().unwrap_or(Self::Passthrough)
    }

    /// Returns `true` for kinds that ignore their routed input.
    pub fn is_generator(self) -> bool {
        matches!(self, Self::Oscillator | Self::Noise)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown node type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownNodeKind;

impl fmt::Display for UnknownNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown node type")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownNodeKind {}

impl FromStr for NodeKind {
    type Err = UnknownNodeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or(UnknownNodeKind)
    }
}
