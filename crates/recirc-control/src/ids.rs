//! Mapping between wire node ids (strings) and engine [`NodeId`]s.
//!
//! The engine only knows numeric ids. Every string id seen on the wire is
//! bound to a `NodeId` the first time it appears and keeps it for as long as
//! the node exists, so replacing a graph that reuses an id keeps that
//! node's state. Numeric ids are never reused.
//!
//! Nodes whose wire type the engine does not recognize run as
//! [`NodeKind::Passthrough`]; the map keeps their original type name so it
//! can be reported back unchanged.

use std::collections::HashMap;

use recirc_core::{NodeId, NodeKind};

/// Bidirectional string ↔ [`NodeId`] map.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    by_name: HashMap<String, NodeId>,
    names: HashMap<NodeId, String>,
    type_names: HashMap<NodeId, String>,
    next: u32,
}

impl IdMap {
    /// Engine id bound to a wire id.
    pub fn resolve(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Wire id bound to an engine id.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Wire id if known, otherwise the numeric id's display form.
    pub fn label(&self, id: NodeId) -> String {
        self.name(id).map_or_else(|| id.to_string(), str::to_string)
    }

    /// Returns the existing binding or binds a fresh id.
    pub fn assign(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.resolve(name) {
            return id;
        }
        let id = NodeId(self.next);
        self.next = self.next.saturating_add(1);
        self.by_name.insert(name.to_string(), id);
        self.names.insert(id, name.to_string());
        id
    }

    /// Records the wire type `id` was built from. Only names that differ
    /// from the kind's own name are kept.
    pub fn set_type_name(&mut self, id: NodeId, wire_type: &str, kind: NodeKind) {
        if kind.as_str().eq_ignore_ascii_case(wire_type) {
            self.type_names.remove(&id);
        } else {
            self.type_names.insert(id, wire_type.to_string());
        }
    }

    /// Wire type of `id`: the recorded name, otherwise the kind's name.
    pub fn type_name(&self, id: NodeId, kind: NodeKind) -> &str {
        self.type_names.get(&id).map_or(kind.as_str(), String::as_str)
    }

    /// Drops a binding.
    pub fn forget(&mut self, name: &str) -> Option<NodeId> {
        let id = self.by_name.remove(name)?;
        self.names.remove(&id);
        self.type_names.remove(&id);
        Some(id)
    }

    /// Keeps only bindings whose engine id satisfies `live`.
    pub fn retain(&mut self, mut live: impl FnMut(NodeId) -> bool) {
        self.by_name.retain(|_, id| live(*id));
        let by_name = &self.by_name;
        self.names.retain(|_, name| by_name.contains_key(name));
        let names = &self.names;
        self.type_names.retain(|id, _| names.contains_key(id));
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns `true` when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
