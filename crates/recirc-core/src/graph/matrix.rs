//! Per-channel routing matrix.
//!
//! `weight[channel][source][dest]` is stored flat, channel-major then
//! source-major, so one channel's `N × N` block is contiguous. Every weight
//! is finite and in `[0, 1]`; dimensions always match the node and channel
//! counts of the owning graph.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use super::GraphError;

/// Clamps a weight into `[0, 1]`, mapping non-finite values to 0.
#[inline]
pub fn sanitize_weight(weight: f32) -> f32 {
    if weight.is_finite() { weight.clamp(0.0, 1.0) } else { 0.0 }
}

/// `channels × nodes × nodes` routing weights.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingMatrix {
    channels: usize,
    nodes: usize,
    weights: Vec<f32>,
}

impl RoutingMatrix {
    /// All-zero matrix.
    pub fn new(channels: usize, nodes: usize) -> Self {
        Self {
            channels,
            nodes,
            weights: vec![0.0; channels * nodes * nodes],
        }
    }

    /// Builds a matrix from nested `[channel][source][dest]` rows.
    ///
    /// Fails with [`GraphError::DimensionMismatch`] on ragged input and
    /// [`GraphError::InvalidWeight`] on non-finite or out-of-range weights.
    pub fn from_nested(nested: &[Vec<Vec<f32>>], nodes: usize) -> Result<Self, GraphError> {
        let channels = nested.len();
        let mut weights = Vec::with_capacity(channels * nodes * nodes);
        for (c, rows) in nested.iter().enumerate() {
            if rows.len() != nodes {
                return Err(GraphError::DimensionMismatch {
                    expected: nodes,
                    found: rows.len(),
                });
            }
            for (s, row) in rows.iter().enumerate() {
                if row.len() != nodes {
                    return Err(GraphError::DimensionMismatch {
                        expected: nodes,
                        found: row.len(),
                    });
                }
                for (d, &w) in row.iter().enumerate() {
                    if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                        return Err(GraphError::InvalidWeight {
                            channel: c,
                            source: s,
                            dest: d,
                        });
                    }
                    weights.push(w);
                }
            }
        }
        Ok(Self {
            channels,
            nodes,
            weights,
        })
    }

    /// Nested `[channel][source][dest]` copy.
    pub fn to_nested(&self) -> Vec<Vec<Vec<f32>>> {
        (0..self.channels)
            .map(|c| (0..self.nodes).map(|s| self.row(c, s).to_vec()).collect())
            .collect()
    }

    /// Channel count.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Node count.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes
    }

    #[inline]
    fn offset(&self, channel: usize, source: usize, dest: usize) -> usize {
        (channel * self.nodes + source) * self.nodes + dest
    }

    /// Weight from `source` to `dest` on `channel`, or `None` out of range.
    #[inline]
    pub fn get(&self, channel: usize, source: usize, dest: usize) -> Option<f32> {
        if channel < self.channels && source < self.nodes && dest < self.nodes {
            Some(self.weights[self.offset(channel, source, dest)])
        } else {
            None
        }
    }

    /// Weight lookup without the `Option`, for the audio path.
    #[inline]
    pub fn weight(&self, channel: usize, source: usize, dest: usize) -> f32 {
        self.weights[self.offset(channel, source, dest)]
    }

    /// Sets one weight (sanitized). Returns the stored value, or `None`
    /// out of range.
    pub fn set(&mut self, channel: usize, source: usize, dest: usize, weight: f32) -> Option<f32> {
        if channel < self.channels && source < self.nodes && dest < self.nodes {
            let offset = self.offset(channel, source, dest);
            let stored = sanitize_weight(weight);
            self.weights[offset] = stored;
            Some(stored)
        } else {
            None
        }
    }

    /// Weights from `source` to every destination on `channel`.
    #[inline]
    pub fn row(&self, channel: usize, source: usize) -> &[f32] {
        let start = self.offset(channel, source, 0);
        &self.weights[start..start + self.nodes]
    }

    /// Grows by one node at the end. The new row and column are zero.
    pub fn push_node(&mut self) {
        let n = self.nodes;
        let grown = n + 1;
        let mut weights = vec![0.0; self.channels * grown * grown];
        for c in 0..self.channels {
            for s in 0..n {
                let from = (c * n + s) * n;
                let to = (c * grown + s) * grown;
                weights[to..to + n].copy_from_slice(&self.weights[from..from + n]);
            }
        }
        self.weights = weights;
        self.nodes = grown;
    }

    /// Removes node `index`'s row and column; higher indices shift down.
    pub fn remove_node(&mut self, index: usize) {
        if index >= self.nodes {
            return;
        }
        let n = self.nodes;
        let shrunk = n - 1;
        let mut weights = Vec::with_capacity(self.channels * shrunk * shrunk);
        for c in 0..self.channels {
            for s in (0..n).filter(|&s| s != index) {
                for d in (0..n).filter(|&d| d != index) {
                    weights.push(self.weights[(c * n + s) * n + d]);
                }
            }
        }
        self.weights = weights;
        self.nodes = shrunk;
    }

    /// Changes the channel count. Existing channels keep their weights;
    /// new channels start at zero.
    pub fn set_channels(&mut self, channels: usize) {
        self.weights.resize(channels * self.nodes * self.nodes, 0.0);
        self.channels = channels;
    }

    /// Checks the dimension and range invariants.
    pub fn validate(&self) -> Result<(), GraphError> {
        let expected = self.channels * self.nodes * self.nodes;
        if self.weights.len() != expected {
            return Err(GraphError::DimensionMismatch {
                expected,
                found: self.weights.len(),
            });
        }
        if let Some(pos) = self.weights.iter().position(|w| !w.is_finite() || !(0.0..=1.0).contains(w)) {
            let per_channel = self.nodes * self.nodes;
            return Err(GraphError::InvalidWeight {
                channel: pos / per_channel,
                source: (pos % per_channel) / self.nodes,
                dest: pos % self.nodes,
            });
        }
        Ok(())
    }
}
