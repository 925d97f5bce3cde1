//! Parameter schema: typed descriptors resolved into fixed `f32` slots.
//!
//! Every node kind publishes a static table of [`ParamDescriptor`]s. A node's
//! parameter values live in a [`Params`] block whose slot `i` corresponds to
//! descriptor `i` of that table, so kernels index arrays on the audio path
//! instead of hashing string keys.
//!
//! # Typed Values
//!
//! Descriptors carry a [`ParamKind`]. All kinds share the `f32` slot
//! representation:
//!
//! | Kind | Slot encoding |
//! |------|---------------|
//! | `Float` | value verbatim |
//! | `Int` | rounded to the nearest integer |
//! | `Bool` | `0.0` or `1.0` |
//! | `Enum` | option index |
//!
//! [`ParamDescriptor::quantize`] enforces the encoding plus the range.
//!
//! # Scaling
//!
//! [`ParamScale`] determines how a value maps to normalized `[0.0, 1.0]`
//! space. Logarithmic scaling is used for frequencies and drive so that
//! modulation moves them perceptually evenly.

/// Maximum number of parameter slots a node kind may declare.
pub const MAX_PARAMS: usize = 8;

/// Scaling curve for parameter normalization.
///
/// - **Linear**: `normalized = (value - min) / (max - min)`
/// - **Logarithmic**: `normalized = ln(value/min) / ln(max/min)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamScale {
    /// Linear mapping (default).
    #[default]
    Linear,
    /// Logarithmic mapping. Requires `min > 0.0`.
    Logarithmic,
}

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Continuous value.
    Float,
    /// Whole-number value.
    Int,
    /// On/off switch.
    Bool,
    /// One of a fixed list of named options.
    Enum(&'static [&'static str]),
}

/// Describes a single parameter's metadata for validation and modulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Display name (e.g., "Delay Time").
    pub name: &'static str,
    /// Stable wire identifier (e.g., `"delayTime"`).
    pub string_id: &'static str,
    /// Value type.
    pub kind: ParamKind,
    /// Minimum allowed value.
    pub min: f32,
    /// Maximum allowed value.
    pub max: f32,
    /// Value a freshly added node starts with.
    pub default: f32,
    /// Recommended increment for stepped controls.
    pub step: f32,
    /// Normalization curve.
    pub scale: ParamScale,
}

impl ParamDescriptor {
    /// Continuous parameter with a linear scale.
    pub const fn float(
        name: &'static str,
        string_id: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            string_id,
            kind: ParamKind::Float,
            min,
            max,
            default,
            step: 0.01,
            scale: ParamScale::Linear,
        }
    }

    /// Whole-number parameter.
    pub const fn int(
        name: &'static str,
        string_id: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            string_id,
            kind: ParamKind::Int,
            min,
            max,
            default,
            step: 1.0,
            scale: ParamScale::Linear,
        }
    }

    /// On/off parameter.
    pub const fn toggle(name: &'static str, string_id: &'static str, default: bool) -> Self {
        Self {
            name,
            string_id,
            kind: ParamKind::Bool,
            min: 0.0,
            max: 1.0,
            default: if default { 1.0 } else { 0.0 },
            step: 1.0,
            scale: ParamScale::Linear,
        }
    }

    /// Named-option parameter. `default` is an index into `options`.
    pub const fn choice(
        name: &'static str,
        string_id: &'static str,
        options: &'static [&'static str],
        default: usize,
    ) -> Self {
        Self {
            name,
            string_id,
            kind: ParamKind::Enum(options),
            min: 0.0,
            max: (options.len() - 1) as f32,
            default: default as f32,
            step: 1.0,
            scale: ParamScale::Linear,
        }
    }

    /// Sets the normalization scale.
    pub const fn with_scale(mut self, scale: ParamScale) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the recommended step.
    pub const fn with_step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    /// Returns `true` for int, bool and enum parameters.
    #[inline]
    pub fn is_discrete(&self) -> bool {
        !matches!(self.kind, ParamKind::Float)
    }

    /// Clamps a value to this parameter's valid range.
    ///
    /// # Example
    ///
    /// ```rust
    /// use recirc_core::ParamDescriptor;
    ///
    /// let desc = ParamDescriptor::float("Gain", "gain", 0.0, 2.0, 1.0);
    /// assert_eq!(desc.clamp(-1.0), 0.0);
    /// assert_eq!(desc.clamp(3.0), 2.0);
    /// ```
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Clamps and snaps a value to this parameter's slot encoding.
    ///
    /// Non-finite input falls back to the default.
    #[inline]
    pub fn quantize(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.default;
        }
        match self.kind {
            ParamKind::Float => self.clamp(value),
            ParamKind::Int | ParamKind::Enum(_) => self.clamp(libm::roundf(value)),
            ParamKind::Bool => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Converts a plain value to normalized range (0.0 to 1.0).
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        let range = self.max - self.min;
        if range == 0.0 {
            return 0.0;
        }
        match self.scale {
            ParamScale::Linear => (value - self.min) / range,
            ParamScale::Logarithmic => {
                if self.min <= 0.0 || value <= 0.0 {
                    return 0.0;
                }
                libm::logf(value / self.min) / libm::logf(self.max / self.min)
            }
        }
    }

    /// Converts a normalized value (0.0 to 1.0) to the actual parameter range.
    ///
    /// Inverse of [`normalize`](Self::normalize).
    #[inline]
    pub fn denormalize(&self, normalized: f32) -> f32 {
        match self.scale {
            ParamScale::Linear => self.min + normalized * (self.max - self.min),
            ParamScale::Logarithmic => {
                if self.min <= 0.0 {
                    return self.min;
                }
                self.min * libm::powf(self.max / self.min, normalized)
            }
        }
    }

    /// Index of a named enum option (case-insensitive).
    pub fn option_index(&self, option: &str) -> Option<usize> {
        match self.kind {
            ParamKind::Enum(options) => options.iter().position(|o| o.eq_ignore_ascii_case(option)),
            _ => None,
        }
    }

    /// Name of the enum option a slot value selects.
    pub fn option_name(&self, value: f32) -> Option<&'static str> {
        match self.kind {
            ParamKind::Enum(options) => options.get(self.quantize(value) as usize).copied(),
            _ => None,
        }
    }
}

/// Fixed-capacity block of parameter slots for one node.
///
/// Slot `i` holds the value of descriptor `i` of the owning node kind's
/// schema. Copyable so the pipeline can resolve modulated values into a
/// scratch block without touching the stored base values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    values: [f32; MAX_PARAMS],
    len: usize,
}

impl Params {
    /// A block holding every descriptor's default.
    pub fn defaults(schema: &[ParamDescriptor]) -> Self {
        debug_assert!(schema.len() <= MAX_PARAMS);
        let mut values = [0.0; MAX_PARAMS];
        for (slot, desc) in values.iter_mut().zip(schema) {
            *slot = desc.default;
        }
        Self {
            values,
            len: schema.len().min(MAX_PARAMS),
        }
    }

    /// Number of populated slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the block has no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value of a slot, or `0.0` if out of range.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        if index < self.len {
            self.values[index]
        } else {
            0.0
        }
    }

    /// Writes a slot. Out-of-range indices are ignored.
    #[inline]
    pub fn set(&mut self, index: usize, value: f32) {
        if index < self.len {
            self.values[index] = value;
        }
    }

    /// Populated slots as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.values[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPES: &[&str] = &["sine", "square", "sawtooth"];

    #[test]
    fn test_quantize_by_kind() {
        let f = ParamDescriptor::float("Mix", "mix", 0.0, 1.0, 0.5);
        assert_eq!(f.quantize(0.25), 0.25);
        assert_eq!(f.quantize(2.0), 1.0);
        assert_eq!(f.quantize(f32::NAN), 0.5);

        let i = ParamDescriptor::int("Taps", "taps", 1.0, 8.0, 2.0);
        assert_eq!(i.quantize(3.4), 3.0);
        assert_eq!(i.quantize(99.0), 8.0);

        let b = ParamDescriptor::toggle("On", "on", false);
        assert_eq!(b.quantize(0.7), 1.0);
        assert_eq!(b.quantize(0.2), 0.0);

        let e = ParamDescriptor::choice("Shape", "shape", SHAPES, 0);
        assert_eq!(e.quantize(1.6), 2.0);
        assert_eq!(e.quantize(-3.0), 0.0);
    }

    #[test]
    fn test_log_normalize_roundtrip() {
        let desc = ParamDescriptor::float("Freq", "frequency", 20.0, 20000.0, 1000.0)
            .with_scale(ParamScale::Logarithmic);
        for &v in &[20.0, 100.0, 1000.0, 15000.0] {
            let back = desc.denormalize(desc.normalize(v));
            assert!((back - v).abs() / v < 1e-3, "{v} -> {back}");
        }
        // Decades are evenly spaced in log space.
        let a = desc.normalize(200.0) - desc.normalize(20.0);
        let b = desc.normalize(2000.0) - desc.normalize(200.0);
        assert!((a - b).abs() < 1e-4);
    }

    #[test]
    fn test_option_lookup() {
        let e = ParamDescriptor::choice("Shape", "shape", SHAPES, 0);
        assert_eq!(e.option_index("SQUARE"), Some(1));
        assert_eq!(e.option_index("pulse"), None);
        assert_eq!(e.option_name(2.0), Some("sawtooth"));
        assert_eq!(e.max, 2.0);
    }

    #[test]
    fn test_params_defaults_and_bounds() {
        let schema = [
            ParamDescriptor::float("A", "a", 0.0, 1.0, 0.25),
            ParamDescriptor::float("B", "b", 0.0, 1.0, 0.75),
        ];
        let mut params = Params::defaults(&schema);
        assert_eq!(params.len(), 2);
        assert_eq!(params.as_slice(), &[0.25, 0.75]);
        params.set(1, 0.1);
        params.set(5, 9.0);
        assert_eq!(params.get(1), 0.1);
        assert_eq!(params.get(5), 0.0);
    }
}
