//! Node identity and per-node data.

use core::fmt;

use crate::modulation::{ModSlot, ModSource, ParamModulation};
use crate::node_kind::NodeKind;
use crate::param_info::{MAX_PARAMS, Params};

/// Stable node identifier.
///
/// Ids survive graph mutations; a node's *index* (its position in the node
/// list, which addresses the routing matrix) does not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Raw numeric identifier.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// One node of the graph: identity, type, base parameters and modulation.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInstance {
    /// Stable id.
    pub id: NodeId,
    /// Node type.
    pub kind: NodeKind,
    /// Base parameter values, quantized to the kind's schema.
    pub params: Params,
    /// Modulation slots, indexed like `params`.
    pub modulation: [ParamModulation; MAX_PARAMS],
}

impl NodeInstance {
    /// A node with default parameters and no modulation.
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            params: kind.default_params(),
            modulation: [ParamModulation::default(); MAX_PARAMS],
        }
    }

    /// Sets a parameter by slot, quantizing to the schema.
    ///
    /// Returns the stored value, or `None` for an unknown slot.
    pub fn set_param(&mut self, index: usize, value: f32) -> Option<f32> {
        let desc = self.kind.params().get(index)?;
        let stored = desc.quantize(value);
        self.params.set(index, stored);
        Some(stored)
    }

    /// Builder form of [`set_param`](Self::set_param) keyed by wire id.
    /// Unknown ids are ignored.
    pub fn with_param(mut self, string_id: &str, value: f32) -> Self {
        if let Some(index) = self.kind.param_index(string_id) {
            self.set_param(index, value);
        }
        self
    }

    /// Parameter value by wire id.
    pub fn param(&self, string_id: &str) -> Option<f32> {
        self.kind.param_index(string_id).map(|i| self.params.get(i))
    }

    /// Edits one modulation slot. Returns `false` for an unknown slot.
    pub fn set_modulation(&mut self, index: usize, source: ModSource, slot: ModSlot) -> bool {
        if index >= self.kind.params().len() {
            return false;
        }
        self.modulation[index].set_slot(source, slot);
        true
    }

    /// Re-quantizes every stored parameter. Used after bulk construction.
    pub fn normalize_params(&mut self) {
        for (i, desc) in self.kind.params().iter().enumerate() {
            self.params.set(i, desc.quantize(self.params.get(i)));
        }
    }
}
