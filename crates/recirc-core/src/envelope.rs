//! Envelope follower for amplitude-driven modulation.
//!
//! Tracks the magnitude of a signal with separate attack and release
//! smoothing. Times are in seconds: over one attack (or release) time the
//! distance to the target shrinks by a factor of 9, giving the one-pole
//! coefficient `exp(-ln(9) / (sample_rate * time))`.

use libm::expf;

/// `ln(9)`.
const LN_9: f32 = 2.197_224_6;

/// Computes a one-pole smoothing coefficient for `time` seconds.
#[inline]
pub fn smoothing_coefficient(time: f32, sample_rate: f32) -> f32 {
    let samples = sample_rate * time;
    if samples > 0.0 && samples.is_finite() {
        expf(-LN_9 / samples)
    } else {
        0.0
    }
}

/// Asymmetric one-pole follower of `|x|`.
///
/// # Example
///
/// ```rust
/// use recirc_core::EnvelopeFollower;
///
/// let mut env = EnvelopeFollower::new(48000.0, 0.01, 0.1);
/// let level = env.process(0.5);
/// assert!(level > 0.0 && level < 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    sample_rate: f32,
    attack: f32,
    release: f32,
}

impl EnvelopeFollower {
    /// Creates a follower with attack and release times in seconds.
    pub fn new(sample_rate: f32, attack: f32, release: f32) -> Self {
        let mut follower = Self {
            envelope: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            sample_rate,
            attack,
            release,
        };
        follower.recalculate_coefficients();
        follower
    }

    /// Updates attack/release times, recomputing coefficients only on change.
    pub fn set_times(&mut self, attack: f32, release: f32) {
        if attack != self.attack || release != self.release {
            self.attack = attack;
            self.release = release;
            self.recalculate_coefficients();
        }
    }

    /// Current envelope level.
    pub fn level(&self) -> f32 {
        self.envelope
    }

    /// Feeds one sample and returns the new envelope level.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let magnitude = input.abs();
        let magnitude = if magnitude.is_finite() { magnitude } else { 0.0 };
        let coeff = if magnitude > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = magnitude + coeff * (self.envelope - magnitude);
        self.envelope = crate::math::flush_denormal(self.envelope);
        self.envelope
    }

    fn recalculate_coefficients(&mut self) {
        self.attack_coeff = smoothing_coefficient(self.attack, self.sample_rate);
        self.release_coeff = smoothing_coefficient(self.release, self.sample_rate);
    }
}
