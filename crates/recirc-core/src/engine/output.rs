//! Output stage: mixer summation, master gain and the RMS guard.
//!
//! Sources are every `output_mixer` node. A graph with exactly one node and
//! no output mixer uses that node instead; anything else is silent. After
//! master gain, each channel's block RMS is measured and, above the
//! threshold, the channel is scaled by `threshold / rms`. Host channels
//! beyond the graph's channel count are zeroed.

use crate::buffer::ChannelBuffer;
use crate::graph::AudioGraph;
use crate::math::rms;
use crate::node_kind::NodeKind;

/// Default RMS ceiling.
pub const DEFAULT_RMS_THRESHOLD: f32 = 0.95;

/// Sums designated node outputs into host buffers and limits them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputStage {
    threshold: f32,
}

impl Default for OutputStage {
    fn default() -> Self {
        Self::new(DEFAULT_RMS_THRESHOLD)
    }
}

impl OutputStage {
    /// Creates a stage with an RMS ceiling in `(0, 1]`.
    pub fn new(threshold: f32) -> Self {
        let threshold = if threshold.is_finite() && threshold > 0.0 {
            threshold.min(1.0)
        } else {
            DEFAULT_RMS_THRESHOLD
        };
        Self { threshold }
    }

    /// RMS ceiling.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Writes the final mix into `output`.
    ///
    /// `on_guard(channel, rms)` is called for every channel the guard
    /// reduced, with the RMS measured before reduction.
    pub fn render(
        &self,
        graph: &AudioGraph,
        buffers: &[ChannelBuffer],
        output: &mut [&mut [f32]],
        mut on_guard: impl FnMut(usize, f32),
    ) {
        let nodes = graph.nodes();
        let has_mixer = nodes.iter().any(|n| n.kind == NodeKind::OutputMixer);
        let single = !has_mixer && nodes.len() == 1;
        let gain = graph.master_gain();
        let channels = graph.output_channels();

        for (c, host) in output.iter_mut().enumerate() {
            host.fill(0.0);
            if c >= channels {
                continue;
            }

            for (node, buffer) in nodes.iter().zip(buffers) {
                if !(single || node.kind == NodeKind::OutputMixer) {
                    continue;
                }
                for (y, &x) in host.iter_mut().zip(buffer.channel(c)) {
                    *y += x;
                }
            }

            for y in host.iter_mut() {
                *y *= gain;
            }

            let level = rms(host);
            if !level.is_finite() {
                host.fill(0.0);
                on_guard(c, level);
            } else if level > self.threshold {
                let scale = self.threshold / level;
                for y in host.iter_mut() {
                    *y *= scale;
                }
                on_guard(c, level);
            }
        }
    }
}
