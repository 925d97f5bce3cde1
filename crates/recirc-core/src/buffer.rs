//! Multichannel audio block owned by one node.
//!
//! Samples are stored channel-major in a single allocation so a block is one
//! contiguous slice per channel. Buffers are sized when the graph changes and
//! only read and written on the audio path.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// `channels × block_size` samples, channel-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBuffer {
    data: Vec<f32>,
    channels: usize,
    block_size: usize,
}

impl ChannelBuffer {
    /// Creates a silent buffer.
    pub fn new(channels: usize, block_size: usize) -> Self {
        Self {
            data: vec![0.0; channels * block_size],
            channels,
            block_size,
        }
    }

    /// Number of channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Samples per channel.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// One channel's samples.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.block_size;
        &self.data[start..start + self.block_size]
    }

    /// One channel's samples, mutably.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.block_size;
        &mut self.data[start..start + self.block_size]
    }

    /// All samples, channel-major.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// All samples, channel-major, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Zeroes every sample.
    #[inline]
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Copies samples from a buffer of the same shape.
    #[inline]
    pub fn copy_from(&mut self, other: &Self) {
        self.data.copy_from_slice(&other.data);
    }

    /// Largest `|x|` across channels at one frame.
    #[inline]
    pub fn frame_peak(&self, frame: usize) -> f32 {
        (0..self.channels)
            .map(|c| self.data[c * self.block_size + frame].abs())
            .fold(0.0, f32::max)
    }

    /// Changes the channel count. Existing channels keep their samples and
    /// new channels start silent. Allocates; call only between blocks.
    pub fn set_channels(&mut self, channels: usize) {
        if channels == self.channels {
            return;
        }
        self.data.resize(channels * self.block_size, 0.0);
        self.channels = channels;
    }
}
