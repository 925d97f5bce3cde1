//! Mathematical utility functions for DSP.
//!
//! All functions are allocation-free and suitable for `no_std`.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//!
//! # Shaping
//!
//! | Function | Character | Used by |
//! |----------|-----------|---------|
//! | [`hard_clip`] | Flat tops, harsh | `hard` / `clip` waveshaper curves |
//! | [`foldback`] | Folded peaks, synthy | `fold` waveshaper curve |
//!
//! # Block Measurements
//!
//! - [`rms`] - Root-mean-square level of a block
//! - [`all_finite`] - Scan a block for NaN / infinity

use libm::{expf, logf, sqrtf};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use recirc_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Values at or below zero map to -120 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        return -120.0;
    }
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear) * FACTOR
}

/// Hard clip to ±threshold range.
#[inline]
pub fn hard_clip(x: f32, threshold: f32) -> f32 {
    x.clamp(-threshold, threshold)
}

/// Foldback distortion.
///
/// When |x| exceeds threshold, the signal "folds" back instead of clipping.
/// Iterates instead of recursing so arbitrarily hot input stays bounded.
#[inline]
pub fn foldback(x: f32, threshold: f32) -> f32 {
    if threshold <= 0.0 {
        return 0.0;
    }
    let mut y = x;
    // Each pass reflects the excess around ±threshold.
    for _ in 0..32 {
        if y > threshold {
            y = 2.0 * threshold - y;
        } else if y < -threshold {
            y = -2.0 * threshold - y;
        } else {
            return y;
        }
    }
    hard_clip(y, threshold)
}

/// Crossfade between dry and wet signals.
///
/// Equivalent to `dry * (1 - mix) + wet * mix` but uses one fewer multiply:
/// `dry + (wet - dry) * mix`.
#[inline]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    dry + (wet - dry) * mix
}

/// Flush subnormal (denormalized) floats to zero.
///
/// Use this in feedback loops (delay lines, filter memory) where signal can
/// decay indefinitely toward zero.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Root-mean-square level of a block. Empty blocks measure 0.
#[inline]
pub fn rms(block: &[f32]) -> f32 {
    if block.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = block.iter().map(|&s| s * s).sum();
    sqrtf(sum_sq / block.len() as f32)
}

/// Returns `true` when every sample in the block is finite.
#[inline]
pub fn all_finite(block: &[f32]) -> bool {
    block.iter().all(|s| s.is_finite())
}
