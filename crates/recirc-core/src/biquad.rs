//! Biquad (bi-quadratic) filter with the eight RBJ cookbook designs.
//!
//! Coefficients are computed once per parameter change by
//! [`BiquadCoefficients::design`] and normalized by `a0`. The filter itself
//! runs the Direct Form I recurrence:
//!
//! ```text
//! y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
//!                - a1*y[n-1] - a2*y[n-2]
//! ```
//!
//! [`Biquad::process_guarded`] protects the recurrence: a non-finite output
//! sample is replaced with zero and all four memory registers are cleared, so
//! one bad sample never poisons later blocks.

use core::f32::consts::PI;
use libm::{cosf, powf, sinf, sqrtf};

/// Filter response selected by a biquad node's `filterType` parameter.
///
/// Discriminants match the option order of the parameter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    /// Second-order low-pass.
    #[default]
    Lowpass,
    /// Second-order high-pass.
    Highpass,
    /// Band-pass with 0 dB peak gain.
    Bandpass,
    /// Band-reject.
    Notch,
    /// Phase-only all-pass.
    Allpass,
    /// Peaking EQ bell.
    Peaking,
    /// Low shelf.
    Lowshelf,
    /// High shelf.
    Highshelf,
}

impl FilterType {
    /// Option names in slot order.
    pub const NAMES: &'static [&'static str] = &[
        "lowpass",
        "highpass",
        "bandpass",
        "notch",
        "allpass",
        "peaking",
        "lowshelf",
        "highshelf",
    ];

    /// Maps an enum slot index to a filter type. Out-of-range indices fall
    /// back to low-pass.
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Self::Highpass,
            2 => Self::Bandpass,
            3 => Self::Notch,
            4 => Self::Allpass,
            5 => Self::Peaking,
            6 => Self::Lowshelf,
            7 => Self::Highshelf,
            _ => Self::Lowpass,
        }
    }
}

/// Normalized biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    /// Feedforward coefficient for x[n].
    pub b0: f32,
    /// Feedforward coefficient for x[n-1].
    pub b1: f32,
    /// Feedforward coefficient for x[n-2].
    pub b2: f32,
    /// Feedback coefficient for y[n-1].
    pub a1: f32,
    /// Feedback coefficient for y[n-2].
    pub a2: f32,
}

impl BiquadCoefficients {
    /// Unity passthrough: `y[n] = x[n]`.
    pub const PASSTHROUGH: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Normalizes raw coefficients by `a0`.
    ///
    /// An `a0` that is zero (or too close to divide by safely) yields
    /// [`PASSTHROUGH`](Self::PASSTHROUGH).
    pub fn from_raw(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        if a0.is_nan() || a0.abs() <= 1e-9 {
            return Self::PASSTHROUGH;
        }
        let a0_inv = 1.0 / a0;
        Self {
            b0: b0 * a0_inv,
            b1: b1 * a0_inv,
            b2: b2 * a0_inv,
            a1: a1 * a0_inv,
            a2: a2 * a0_inv,
        }
    }

    /// Designs coefficients for a filter type using the RBJ Audio EQ Cookbook.
    ///
    /// # Arguments
    ///
    /// * `filter` - Response shape
    /// * `frequency` - Cutoff / center frequency in Hz
    /// * `q` - Quality factor (0.707 for Butterworth)
    /// * `gain_db` - Gain in dB, used by peaking and shelving designs only
    /// * `sample_rate` - Sample rate in Hz
    pub fn design(
        filter: FilterType,
        frequency: f32,
        q: f32,
        gain_db: f32,
        sample_rate: f32,
    ) -> Self {
        let omega = 2.0 * PI * frequency / sample_rate;
        let cos_w = cosf(omega);
        let sin_w = sinf(omega);
        let alpha = sin_w / (2.0 * q.max(1e-3));
        // sqrt(10^(dB/20))
        let a = powf(10.0, gain_db / 40.0);

        match filter {
            FilterType::Lowpass => Self::from_raw(
                (1.0 - cos_w) / 2.0,
                1.0 - cos_w,
                (1.0 - cos_w) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            FilterType::Highpass => Self::from_raw(
                (1.0 + cos_w) / 2.0,
                -(1.0 + cos_w),
                (1.0 + cos_w) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            FilterType::Bandpass => Self::from_raw(
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            FilterType::Notch => Self::from_raw(
                1.0,
                -2.0 * cos_w,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            FilterType::Allpass => Self::from_raw(
                1.0 - alpha,
                -2.0 * cos_w,
                1.0 + alpha,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            FilterType::Peaking => Self::from_raw(
                1.0 + alpha * a,
                -2.0 * cos_w,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w,
                1.0 - alpha / a,
            ),
            FilterType::Lowshelf => {
                let beta = 2.0 * sqrtf(a) * alpha;
                Self::from_raw(
                    a * ((a + 1.0) - (a - 1.0) * cos_w + beta),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
                    a * ((a + 1.0) - (a - 1.0) * cos_w - beta),
                    (a + 1.0) + (a - 1.0) * cos_w + beta,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
                    (a + 1.0) + (a - 1.0) * cos_w - beta,
                )
            }
            FilterType::Highshelf => {
                let beta = 2.0 * sqrtf(a) * alpha;
                Self::from_raw(
                    a * ((a + 1.0) + (a - 1.0) * cos_w + beta),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w),
                    a * ((a + 1.0) + (a - 1.0) * cos_w - beta),
                    (a + 1.0) - (a - 1.0) * cos_w + beta,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w),
                    (a + 1.0) - (a - 1.0) * cos_w - beta,
                )
            }
        }
    }
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::PASSTHROUGH
    }
}

/// Direct Form I biquad with two-sample input and output memory.
#[derive(Debug, Clone, Default)]
pub struct Biquad {
    coeffs: BiquadCoefficients,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Creates a passthrough biquad.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a biquad with the given coefficients and cleared memory.
    pub fn with_coefficients(coeffs: BiquadCoefficients) -> Self {
        Self {
            coeffs,
            ..Self::default()
        }
    }

    /// Replaces the coefficients. Memory is kept so parameter sweeps stay
    /// continuous.
    pub fn set_coefficients(&mut self, coeffs: BiquadCoefficients) {
        self.coeffs = coeffs;
    }

    /// Current coefficients.
    pub fn coefficients(&self) -> BiquadCoefficients {
        self.coeffs
    }

    /// Runs one sample through the recurrence.
    ///
    /// Returns `None` when the result is not finite. In that case all four
    /// memory registers have already been reset and the caller should emit
    /// silence for this sample.
    #[inline]
    pub fn process_guarded(&mut self, input: f32) -> Option<f32> {
        let c = &self.coeffs;
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        if !output.is_finite() {
            self.clear();
            return None;
        }

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        Some(output)
    }

    /// Clears the memory registers without touching coefficients.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// Memory registers as `[x1, x2, y1, y2]`.
    pub fn memory(&self) -> [f32; 4] {
        [self.x1, self.x2, self.y1, self.y2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc_gain(filter: FilterType, gain_db: f32) -> f32 {
        let mut biquad =
            Biquad::with_coefficients(BiquadCoefficients::design(filter, 1000.0, 0.707, gain_db, 44100.0));
        let mut output = 0.0;
        for _ in 0..4000 {
            output = biquad.process_guarded(1.0).unwrap_or(0.0);
        }
        output
    }

    #[test]
    fn test_passthrough() {
        let mut biquad = Biquad::new();
        for i in 0..10 {
            let input = i as f32 * 0.1;
            let output = biquad.process_guarded(input).unwrap();
            assert!((output - input).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_a0_is_passthrough() {
        let coeffs = BiquadCoefficients::from_raw(0.3, 0.2, 0.1, 0.0, 0.5, 0.5);
        assert_eq!(coeffs, BiquadCoefficients::PASSTHROUGH);
    }

    #[test]
    fn test_all_designs_finite() {
        for index in 0..FilterType::NAMES.len() {
            let filter = FilterType::from_index(index);
            for &(freq, q, gain) in &[(20.0, 0.1, -24.0), (1000.0, 0.707, 0.0), (20000.0, 30.0, 24.0)] {
                let c = BiquadCoefficients::design(filter, freq, q, gain, 44100.0);
                assert!(
                    [c.b0, c.b1, c.b2, c.a1, c.a2].iter().all(|v| v.is_finite()),
                    "{filter:?} at {freq} Hz produced {c:?}"
                );
            }
        }
    }

    #[test]
    fn test_lowpass_dc_pass() {
        assert!((dc_gain(FilterType::Lowpass, 0.0) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        assert!(dc_gain(FilterType::Highpass, 0.0).abs() < 0.01);
    }

    #[test]
    fn test_shelves_at_dc() {
        // A low shelf applies its gain at DC; a high shelf leaves DC alone.
        let low = dc_gain(FilterType::Lowshelf, 6.0);
        assert!((low - crate::math::db_to_linear(6.0)).abs() < 0.05, "low shelf DC = {low}");
        let high = dc_gain(FilterType::Highshelf, 6.0);
        assert!((high - 1.0).abs() < 0.05, "high shelf DC = {high}");
    }

    #[test]
    fn test_allpass_unity_dc() {
        assert!((dc_gain(FilterType::Allpass, 0.0) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_unstable_recurrence_is_contained() {
        // Poles well outside the unit circle diverge within a few hundred samples.
        let coeffs = BiquadCoefficients {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: -3.0,
            a2: 2.5,
        };
        let mut biquad = Biquad::with_coefficients(coeffs);
        let mut tripped = false;
        for _ in 0..2000 {
            match biquad.process_guarded(1.0) {
                Some(y) => assert!(y.is_finite()),
                None => {
                    tripped = true;
                    assert_eq!(biquad.memory(), [0.0; 4]);
                }
            }
        }
        assert!(tripped, "recurrence never overflowed");
    }
}
