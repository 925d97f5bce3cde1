//! Low-frequency oscillator for global modulation.
//!
//! The engine evaluates LFOs once per block: [`Lfo::value`] reads the
//! waveform at the current phase and [`Lfo::advance`] moves the phase by a
//! block's worth of samples. The held-random waveform draws a new value each
//! time the phase wraps.

use crate::rng::XorShift32;
use core::f32::consts::TAU;
use libm::{floorf, sinf};

/// LFO waveform. Discriminants match the `waveform` option order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    /// Smooth sinusoid.
    #[default]
    Sine,
    /// ±1 with a 50% duty cycle.
    Square,
    /// Linear up/down ramp.
    Triangle,
    /// Rising ramp with an abrupt reset.
    Sawtooth,
    /// Random level held for one cycle.
    Random,
}

impl LfoWaveform {
    /// Option names in index order.
    pub const NAMES: &'static [&'static str] = &["sine", "square", "triangle", "sawtooth", "random"];

    /// Maps an index to a waveform, falling back to sine.
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Self::Square,
            2 => Self::Triangle,
            3 => Self::Sawtooth,
            4 => Self::Random,
            _ => Self::Sine,
        }
    }

    /// Index of this waveform in [`NAMES`](Self::NAMES).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Looks up a waveform by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(Self::from_index)
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        Self::NAMES[self.index()]
    }
}

/// Phase-accumulating modulation oscillator with output in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    held: f32,
    rng: XorShift32,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(XorShift32::DEFAULT_SEED)
    }
}

impl Lfo {
    /// Creates an LFO at phase 0. `seed` drives the held-random waveform.
    pub fn new(seed: u32) -> Self {
        let mut rng = XorShift32::new(seed);
        let held = rng.next_bipolar();
        Self {
            phase: 0.0,
            held,
            rng,
        }
    }

    /// Current phase in `[0, 1)`.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Waveform value at the current phase.
    #[inline]
    pub fn value(&self, waveform: LfoWaveform) -> f32 {
        let p = self.phase;
        match waveform {
            LfoWaveform::Sine => sinf(p * TAU),
            LfoWaveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoWaveform::Triangle => {
                if p < 0.5 {
                    4.0 * p - 1.0
                } else {
                    3.0 - 4.0 * p
                }
            }
            LfoWaveform::Sawtooth => 2.0 * p - 1.0,
            LfoWaveform::Random => self.held,
        }
    }

    /// Advances the phase by `samples` at `frequency` Hz. Redraws the held
    /// random value when the phase wraps.
    #[inline]
    pub fn advance(&mut self, frequency: f32, sample_rate: f32, samples: usize) {
        if !frequency.is_finite() || frequency <= 0.0 || sample_rate.is_nan() || sample_rate <= 0.0 {
            return;
        }
        let next = self.phase + frequency * samples as f32 / sample_rate;
        if next >= 1.0 {
            self.held = self.rng.next_bipolar();
            self.phase = next - floorf(next);
        } else {
            self.phase = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_advance_completes_cycle() {
        let mut lfo = Lfo::default();
        // 1 Hz at 48 kHz in 128-sample blocks: 375 blocks per second.
        for _ in 0..375 {
            lfo.advance(1.0, 48000.0, 128);
        }
        let phase_error = lfo.phase().min((lfo.phase() - 1.0).abs());
        assert!(phase_error < 1e-3, "phase = {}", lfo.phase());
    }

    #[test]
    fn test_output_range() {
        let mut lfo = Lfo::new(99);
        for index in 0..LfoWaveform::NAMES.len() {
            let waveform = LfoWaveform::from_index(index);
            for _ in 0..500 {
                let v = lfo.value(waveform);
                assert!((-1.0..=1.0).contains(&v), "{waveform:?} produced {v}");
                lfo.advance(7.3, 48000.0, 128);
            }
        }
    }

    #[test]
    fn test_random_holds_within_cycle() {
        let mut lfo = Lfo::new(5);
        let first = lfo.value(LfoWaveform::Random);
        lfo.advance(1.0, 1000.0, 100);
        assert_eq!(lfo.value(LfoWaveform::Random), first);
        lfo.advance(1.0, 1000.0, 950);
        assert_ne!(lfo.value(LfoWaveform::Random), first);
    }

    #[test]
    fn test_shapes_at_known_phases() {
        let mut lfo = Lfo::default();
        assert_eq!(lfo.value(LfoWaveform::Square), 1.0);
        assert_eq!(lfo.value(LfoWaveform::Triangle), -1.0);
        assert_eq!(lfo.value(LfoWaveform::Sawtooth), -1.0);
        lfo.advance(1.0, 4.0, 1);
        assert!((lfo.value(LfoWaveform::Sine) - 1.0).abs() < 1e-6);
        assert_eq!(lfo.value(LfoWaveform::Triangle), 0.0);
    }

    #[test]
    fn test_waveform_names() {
        assert_eq!(LfoWaveform::from_name("Triangle"), Some(LfoWaveform::Triangle));
        assert_eq!(LfoWaveform::from_name("noise"), None);
        assert_eq!(LfoWaveform::Random.as_str(), "random");
    }
}
