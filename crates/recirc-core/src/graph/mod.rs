//! Graph model: node list, routing matrix and global settings.
//!
//! Node order defines the index used by the routing matrix. Every mutation
//! keeps the matrix dimensions equal to `[channels][N][N]`:
//!
//! - adding a node appends a zero row and column
//! - removing a node drops its row and column and shifts higher indices down
//! - changing the channel count keeps existing channels and zero-fills new ones
//!
//! Mutations on unknown ids fail with [`GraphError::UnknownNode`] and leave
//! the graph untouched.
//!
//! # Example
//!
//! ```rust
//! use recirc_core::graph::AudioGraph;
//! use recirc_core::NodeKind;
//!
//! let mut graph = AudioGraph::new(2);
//! let osc = graph.add_node(NodeKind::Oscillator);
//! let out = graph.add_node(NodeKind::OutputMixer);
//! graph.set_matrix_weight(0, osc, out, 1.0).unwrap();
//! graph.set_matrix_weight(1, osc, out, 1.0).unwrap();
//! assert_eq!(graph.weight(0, osc, out), Some(1.0));
//! ```

#[cfg(not(feature = "std"))]
use alloc::{string::ToString, vec::Vec};

pub mod error;
pub mod matrix;
pub mod node;

pub use error::GraphError;
pub use matrix::RoutingMatrix;
pub use node::{NodeId, NodeInstance};

use crate::modulation::{EnvelopeSettings, GlobalModulation, LfoSettings, ModSlot, ModSource};
use crate::node_kind::NodeKind;

/// The whole topology: nodes, routing weights and global settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioGraph {
    nodes: Vec<NodeInstance>,
    matrix: RoutingMatrix,
    master_gain: f32,
    modulation: GlobalModulation,
    next_id: u32,
}

impl AudioGraph {
    /// Empty graph with `output_channels` channels (at least one).
    pub fn new(output_channels: usize) -> Self {
        Self {
            nodes: Vec::new(),
            matrix: RoutingMatrix::new(output_channels.max(1), 0),
            master_gain: 1.0,
            modulation: GlobalModulation::default(),
            next_id: 0,
        }
    }

    /// Assembles a graph from parts, checking every invariant.
    ///
    /// Parameters are re-quantized and modulation settings clamped; ids,
    /// dimensions, weights, master gain and envelope sources must already
    /// be valid.
    pub fn from_parts(
        mut nodes: Vec<NodeInstance>,
        matrix: RoutingMatrix,
        master_gain: f32,
        modulation: GlobalModulation,
    ) -> Result<Self, GraphError> {
        for node in &mut nodes {
            node.normalize_params();
        }
        let next_id = nodes.iter().map(|n| n.id.0.saturating_add(1)).max().unwrap_or(0);
        let graph = Self {
            nodes,
            matrix,
            master_gain,
            modulation: modulation.sanitized(),
            next_id,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Checks dimensions, weight ranges, id uniqueness, master gain and
    /// envelope sources.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.matrix.channels() == 0 {
            return Err(GraphError::InvalidChannelCount {
                requested: 0,
                max: usize::MAX,
            });
        }
        if self.matrix.node_count() != self.nodes.len() {
            return Err(GraphError::DimensionMismatch {
                expected: self.nodes.len(),
                found: self.matrix.node_count(),
            });
        }
        self.matrix.validate()?;
        for (i, node) in self.nodes.iter().enumerate() {
            if self.nodes[..i].iter().any(|n| n.id == node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
        }
        if !self.master_gain.is_finite() || self.master_gain < 0.0 {
            return Err(GraphError::InvalidValue {
                what: "master gain",
                value: self.master_gain,
            });
        }
        for env in &self.modulation.envelopes {
            if let Some(source) = env.source {
                self.index_of(source).ok_or(GraphError::UnknownNode(source))?;
            }
        }
        Ok(())
    }

    /// Nodes in index order.
    #[inline]
    pub fn nodes(&self) -> &[NodeInstance] {
        &self.nodes
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when the graph has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of a node, if present.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Routing matrix.
    #[inline]
    pub fn matrix(&self) -> &RoutingMatrix {
        &self.matrix
    }

    /// Channel count.
    #[inline]
    pub fn output_channels(&self) -> usize {
        self.matrix.channels()
    }

    /// Master output gain.
    #[inline]
    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    /// Global modulation settings.
    #[inline]
    pub fn modulation(&self) -> &GlobalModulation {
        &self.modulation
    }

    /// Adds a node with default parameters and a fresh id.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.nodes.push(NodeInstance::new(id, kind));
        self.matrix.push_node();
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add: {kind} node {id}");
        id
    }

    /// Adds a node carrying its own id. Returns its index.
    pub fn insert_node(&mut self, mut instance: NodeInstance) -> Result<usize, GraphError> {
        if self.index_of(instance.id).is_some() {
            return Err(GraphError::DuplicateNode(instance.id));
        }
        instance.normalize_params();
        self.next_id = self.next_id.max(instance.id.0.saturating_add(1));
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_insert: {} node {}", instance.kind, instance.id);
        self.nodes.push(instance);
        self.matrix.push_node();
        Ok(self.nodes.len() - 1)
    }

    /// Removes a node and its matrix row and column. Returns the index it
    /// occupied. Envelope followers tracking it lose their source.
    pub fn remove_node(&mut self, id: NodeId) -> Result<usize, GraphError> {
        let index = self.index_of(id).ok_or(GraphError::UnknownNode(id))?;
        self.nodes.remove(index);
        self.matrix.remove_node(index);
        for env in &mut self.modulation.envelopes {
            if env.source == Some(id) {
                env.source = None;
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_remove: node {id} (index {index})");
        Ok(index)
    }

    /// Sets a parameter by slot. Returns the quantized stored value.
    pub fn update_parameter(&mut self, id: NodeId, index: usize, value: f32) -> Result<f32, GraphError> {
        let node = self.node_mut(id)?;
        let kind = node.kind;
        node.set_param(index, value).ok_or_else(|| GraphError::UnknownParameter {
            node: id,
            parameter: kind.params().get(index).map_or_else(|| index.to_string(), |d| d.string_id.to_string()),
        })
    }

    /// Sets a parameter by wire id. Returns `(slot, stored value)`.
    pub fn update_parameter_by_name(
        &mut self,
        id: NodeId,
        parameter: &str,
        value: f32,
    ) -> Result<(usize, f32), GraphError> {
        let node = self.node_mut(id)?;
        let index = node.kind.param_index(parameter).ok_or_else(|| GraphError::UnknownParameter {
            node: id,
            parameter: parameter.to_string(),
        })?;
        let stored = node.set_param(index, value).unwrap_or(value);
        Ok((index, stored))
    }

    /// Edits one modulation slot of one parameter.
    pub fn set_modulation(
        &mut self,
        id: NodeId,
        parameter: &str,
        source: ModSource,
        slot: ModSlot,
    ) -> Result<usize, GraphError> {
        let node = self.node_mut(id)?;
        let index = node.kind.param_index(parameter).ok_or_else(|| GraphError::UnknownParameter {
            node: id,
            parameter: parameter.to_string(),
        })?;
        node.set_modulation(index, source, slot);
        Ok(index)
    }

    /// Sets `weight[channel][source][dest]`, clamped to `[0, 1]`. Returns
    /// the stored weight.
    pub fn set_matrix_weight(
        &mut self,
        channel: usize,
        source: NodeId,
        dest: NodeId,
        weight: f32,
    ) -> Result<f32, GraphError> {
        let s = self.index_of(source).ok_or(GraphError::UnknownNode(source))?;
        let d = self.index_of(dest).ok_or(GraphError::UnknownNode(dest))?;
        self.matrix
            .set(channel, s, d, weight)
            .ok_or(GraphError::ChannelOutOfRange {
                channel,
                channels: self.matrix.channels(),
            })
    }

    /// Weight lookup by id.
    pub fn weight(&self, channel: usize, source: NodeId, dest: NodeId) -> Option<f32> {
        self.matrix.get(channel, self.index_of(source)?, self.index_of(dest)?)
    }

    /// Changes the channel count (at least one).
    pub fn set_output_channels(&mut self, channels: usize) -> Result<(), GraphError> {
        if channels == 0 {
            return Err(GraphError::InvalidChannelCount {
                requested: channels,
                max: usize::MAX,
            });
        }
        self.matrix.set_channels(channels);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_channels: {channels}");
        Ok(())
    }

    /// Sets the master gain (finite, non-negative).
    pub fn set_master_gain(&mut self, gain: f32) -> Result<(), GraphError> {
        if !gain.is_finite() || gain < 0.0 {
            return Err(GraphError::InvalidValue {
                what: "master gain",
                value: gain,
            });
        }
        self.master_gain = gain;
        Ok(())
    }

    /// Sets the chaos level, clamped to `[0, 1]`.
    pub fn set_chaos_level(&mut self, level: f32) -> Result<(), GraphError> {
        if !level.is_finite() {
            return Err(GraphError::InvalidValue {
                what: "chaos level",
                value: level,
            });
        }
        self.modulation.chaos_level = level.clamp(0.0, 1.0);
        Ok(())
    }

    /// Replaces LFO `index` (0 or 1).
    pub fn set_lfo(&mut self, index: usize, settings: LfoSettings) -> Result<(), GraphError> {
        let slot = self.modulation.lfos.get_mut(index).ok_or(GraphError::InvalidValue {
            what: "lfo index",
            value: index as f32,
        })?;
        *slot = settings.sanitized();
        Ok(())
    }

    /// Replaces envelope follower `index` (0 or 1). Its source must exist.
    pub fn set_envelope(&mut self, index: usize, settings: EnvelopeSettings) -> Result<(), GraphError> {
        if let Some(source) = settings.source {
            self.index_of(source).ok_or(GraphError::UnknownNode(source))?;
        }
        let slot = self.modulation.envelopes.get_mut(index).ok_or(GraphError::InvalidValue {
            what: "envelope index",
            value: index as f32,
        })?;
        *slot = settings.sanitized();
        Ok(())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeInstance, GraphError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(GraphError::UnknownNode(id))
    }
}

impl Default for AudioGraph {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> (AudioGraph, Vec<NodeId>) {
        let mut graph = AudioGraph::new(2);
        let ids: Vec<_> = (0..n).map(|_| graph.add_node(NodeKind::Gain)).collect();
        (graph, ids)
    }

    #[test]
    fn test_add_resizes_matrix() {
        let (graph, ids) = chain(3);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.matrix().node_count(), 3);
        assert_eq!(ids, vec![NodeId(0), NodeId(1), NodeId(2)]);
        graph.validate().unwrap();
    }

    #[test]
    fn test_remove_middle_keeps_survivor_weights() {
        let (mut graph, ids) = chain(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        graph.set_matrix_weight(0, a, c, 0.25).unwrap();
        graph.set_matrix_weight(0, c, a, 0.5).unwrap();
        graph.set_matrix_weight(1, c, c, 0.75).unwrap();
        graph.set_matrix_weight(0, a, b, 1.0).unwrap();

        assert_eq!(graph.remove_node(b), Ok(1));
        assert_eq!(graph.matrix().node_count(), 2);
        assert_eq!(graph.weight(0, a, c), Some(0.25));
        assert_eq!(graph.weight(0, c, a), Some(0.5));
        assert_eq!(graph.weight(1, c, c), Some(0.75));
        assert_eq!(graph.weight(0, a, a), Some(0.0));
        assert_eq!(graph.index_of(c), Some(1));
    }

    #[test]
    fn test_unknown_node_is_reported_and_harmless() {
        let (mut graph, ids) = chain(2);
        let before = graph.clone();
        let ghost = NodeId(99);
        assert_eq!(graph.remove_node(ghost), Err(GraphError::UnknownNode(ghost)));
        assert_eq!(graph.update_parameter(ghost, 0, 1.0), Err(GraphError::UnknownNode(ghost)));
        assert_eq!(
            graph.set_matrix_weight(0, ids[0], ghost, 1.0),
            Err(GraphError::UnknownNode(ghost))
        );
        assert_eq!(graph, before);
    }

    #[test]
    fn test_unknown_parameter() {
        let (mut graph, ids) = chain(1);
        let err = graph.update_parameter_by_name(ids[0], "feedback", 0.5).unwrap_err();
        assert!(matches!(err, GraphError::UnknownParameter { ref parameter, .. } if parameter == "feedback"));
    }

    #[test]
    fn test_parameter_clamped() {
        let (mut graph, ids) = chain(1);
        assert_eq!(graph.update_parameter_by_name(ids[0], "gain", 9.0), Ok((0, 2.0)));
        assert_eq!(graph.node(ids[0]).unwrap().param("gain"), Some(2.0));
    }

    #[test]
    fn test_insert_rejects_duplicates_and_advances_ids() {
        let mut graph = AudioGraph::new(1);
        graph.insert_node(NodeInstance::new(NodeId(10), NodeKind::Noise)).unwrap();
        assert_eq!(
            graph.insert_node(NodeInstance::new(NodeId(10), NodeKind::Gain)),
            Err(GraphError::DuplicateNode(NodeId(10)))
        );
        assert_eq!(graph.add_node(NodeKind::Gain), NodeId(11));
    }

    #[test]
    fn test_channel_out_of_range() {
        let (mut graph, ids) = chain(2);
        assert_eq!(
            graph.set_matrix_weight(2, ids[0], ids[1], 0.5),
            Err(GraphError::ChannelOutOfRange { channel: 2, channels: 2 })
        );
    }

    #[test]
    fn test_remove_clears_envelope_source() {
        let (mut graph, ids) = chain(2);
        graph
            .set_envelope(
                1,
                EnvelopeSettings {
                    enabled: true,
                    source: Some(ids[1]),
                    ..EnvelopeSettings::default()
                },
            )
            .unwrap();
        graph.remove_node(ids[1]).unwrap();
        assert_eq!(graph.modulation().envelopes[1].source, None);
    }

    #[test]
    fn test_envelope_source_must_exist() {
        let (mut graph, _) = chain(1);
        let settings = EnvelopeSettings {
            source: Some(NodeId(42)),
            ..EnvelopeSettings::default()
        };
        assert_eq!(graph.set_envelope(0, settings), Err(GraphError::UnknownNode(NodeId(42))));
    }

    #[test]
    fn test_from_parts_checks_dimensions() {
        let nodes = vec![NodeInstance::new(NodeId(0), NodeKind::Gain)];
        let wrong = RoutingMatrix::new(2, 2);
        assert!(matches!(
            AudioGraph::from_parts(nodes.clone(), wrong, 1.0, GlobalModulation::default()),
            Err(GraphError::DimensionMismatch { .. })
        ));
        let graph = AudioGraph::from_parts(nodes, RoutingMatrix::new(2, 1), 1.0, GlobalModulation::default())
            .unwrap();
        assert_eq!(graph.output_channels(), 2);
    }

    #[test]
    fn test_from_parts_rejects_duplicate_ids_and_bad_gain() {
        let nodes = vec![
            NodeInstance::new(NodeId(1), NodeKind::Gain),
            NodeInstance::new(NodeId(1), NodeKind::Delay),
        ];
        assert_eq!(
            AudioGraph::from_parts(nodes, RoutingMatrix::new(1, 2), 1.0, GlobalModulation::default()),
            Err(GraphError::DuplicateNode(NodeId(1)))
        );
        assert!(matches!(
            AudioGraph::from_parts(Vec::new(), RoutingMatrix::new(1, 0), -1.0, GlobalModulation::default()),
            Err(GraphError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_set_output_channels() {
        let (mut graph, ids) = chain(2);
        graph.set_matrix_weight(0, ids[0], ids[1], 0.5).unwrap();
        graph.set_output_channels(4).unwrap();
        assert_eq!(graph.weight(0, ids[0], ids[1]), Some(0.5));
        assert_eq!(graph.weight(3, ids[0], ids[1]), Some(0.0));
        assert!(graph.set_output_channels(0).is_err());
    }
}
