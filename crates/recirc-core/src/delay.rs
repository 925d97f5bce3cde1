//! Integer-sample ring buffer used by delay nodes.
//!
//! A [`DelayLine`] is sized once for the longest delay the engine supports
//! and never reallocates on the audio path. Reads happen before writes so a
//! delay of `d` samples returns the sample written exactly `d` calls earlier.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Fixed-capacity circular delay buffer.
///
/// # Example
///
/// ```rust
/// use recirc_core::DelayLine;
///
/// let mut line = DelayLine::from_time(1000.0, 0.01);
/// line.write(1.0);
/// for _ in 0..4 {
///     line.write(0.0);
/// }
/// // The impulse was written 5 calls ago.
/// assert_eq!(line.read(5), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Creates a delay line holding `len` samples. A zero length is bumped
    /// to 2 so a one-sample delay is always representable.
    pub fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(2)],
            write_pos: 0,
        }
    }

    /// Creates a delay line able to hold `max_seconds` at `sample_rate`.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        Self::new((sample_rate * max_seconds.max(0.0)) as usize + 1)
    }

    /// Buffer length in samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Always `false`; a delay line holds at least two samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Longest delay, in samples, that [`read`](Self::read) can serve.
    #[inline]
    pub fn max_delay(&self) -> usize {
        self.buffer.len() - 1
    }

    /// Converts a delay time to a sample count clamped to `1..=max_delay`.
    #[inline]
    pub fn delay_samples(&self, seconds: f32, sample_rate: f32) -> usize {
        let samples = libm::roundf(seconds * sample_rate);
        if samples.is_finite() && samples >= 1.0 {
            (samples as usize).min(self.max_delay())
        } else {
            1
        }
    }

    /// Reads the sample written `delay` writes ago (`delay >= 1`).
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1, len - 1);
        self.buffer[(self.write_pos + len - delay) % len]
    }

    /// Writes one sample and advances the cursor.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos == self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Zeroes the buffer and rewinds the cursor.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
