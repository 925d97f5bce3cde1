//! Graph documents as they travel on the wire.
//!
//! A graph document is the JSON form of an [`AudioGraph`]:
//!
//! ```json
//! {
//!   "nodes": [
//!     {"id": "osc", "type": "oscillator", "parameters": {"waveform": "sawtooth", "frequency": 110}},
//!     {"id": "out", "type": "output_mixer"}
//!   ],
//!   "routingMatrix": [[[0, 1], [0, 0]], [[0, 1], [0, 0]]],
//!   "outputChannels": 2,
//!   "masterGain": 0.8,
//!   "modulation": {"lfo1": {"enabled": true, "frequency": 0.5}, "chaosLevel": 0.1}
//! }
//! ```
//!
//! Node ids are strings here; [`IdMap`] binds them to engine ids during
//! conversion. An empty `routingMatrix` stands for an all-zero matrix;
//! anything else must have exactly `[outputChannels][N][N]` finite weights
//! in `[0, 1]`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use recirc_core::{
    AudioGraph, EnvelopeSettings, GlobalModulation, LfoSettings, LfoWaveform, ModSlot, ModSource,
    NodeId, NodeInstance, NodeKind, ParamDescriptor, ParamKind, RoutingMatrix,
};

use crate::error::ControlError;
use crate::ids::IdMap;

/// A typed parameter value: number, switch, or option name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// `true` / `false`.
    Bool(bool),
    /// Any number. Enum parameters accept the option index.
    Number(f32),
    /// Enum option name (case-insensitive).
    Text(String),
}

impl ParamValue {
    /// Slot encoding of this value for `desc`, before quantization.
    pub fn resolve(&self, desc: &ParamDescriptor) -> Result<f32, ControlError> {
        match self {
            ParamValue::Number(v) if v.is_finite() => Ok(*v),
            ParamValue::Number(v) => Err(ControlError::invalid_value(desc.string_id, format!("{v} is not finite"))),
            ParamValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            ParamValue::Text(name) => desc.option_index(name).map(|i| i as f32).ok_or_else(|| {
                let reason = match desc.kind {
                    ParamKind::Enum(options) => format!("'{name}' is not one of {}", options.join(", ")),
                    _ => format!("expected a number, got '{name}'"),
                };
                ControlError::invalid_value(desc.string_id, reason)
            }),
        }
    }

    /// Wire form of a stored slot value: option names for enums, booleans
    /// for switches, numbers otherwise.
    pub fn from_slot(desc: &ParamDescriptor, value: f32) -> Self {
        match desc.kind {
            ParamKind::Enum(_) => desc
                .option_name(value)
                .map_or(ParamValue::Number(value), |name| ParamValue::Text(name.to_string())),
            ParamKind::Bool => ParamValue::Bool(value >= 0.5),
            ParamKind::Float | ParamKind::Int => ParamValue::Number(value),
        }
    }

    /// Numeric reading: booleans as 0/1, text parsed as a number.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParamValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Boolean reading: numbers at or above 0.5 are on.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Number(v) => Some(*v >= 0.5),
            ParamValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

/// One modulation slot on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModSlotDef {
    /// Whether the slot contributes.
    pub enabled: bool,
    /// Depth in native units (linear) or normalized units (logarithmic).
    pub amount: f32,
}

/// A node on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    /// Wire id.
    pub id: String,
    /// Node type name (`"delay"`, `"output_mixer"`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Parameter values by id. Missing ids take their defaults.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
    /// Modulation slots: parameter id → source name → slot.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modulation: BTreeMap<String, BTreeMap<String, ModSlotDef>>,
}

impl NodeDef {
    /// A node of `kind` with default parameters.
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            parameters: BTreeMap::new(),
            modulation: BTreeMap::new(),
        }
    }

    /// Builder: sets one parameter.
    pub fn with_param(mut self, id: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(id.into(), value.into());
        self
    }

    /// Builder: sets one modulation slot.
    pub fn with_modulation(mut self, parameter: impl Into<String>, source: ModSource, amount: f32) -> Self {
        self.modulation
            .entry(parameter.into())
            .or_default()
            .insert(source.as_str().to_string(), ModSlotDef { enabled: true, amount });
        self
    }

    /// Engine kind for the node type. Unrecognized types run as
    /// [`NodeKind::Passthrough`].
    pub fn node_kind(&self) -> NodeKind {
        NodeKind::from_name_or_passthrough(&self.kind)
    }

    /// Returns `true` if the type names a built-in kind.
    pub fn is_recognized(&self) -> bool {
        self.kind.parse::<NodeKind>().is_ok()
    }

    /// Builds the engine-side node under `id`.
    ///
    /// Parameters and modulation on a node of unrecognized type have no
    /// schema to land in and are ignored.
    pub fn to_instance(&self, id: NodeId) -> Result<NodeInstance, ControlError> {
        let kind = self.node_kind();
        let mut instance = NodeInstance::new(id, kind);

        if !self.is_recognized() {
            tracing::warn!(node = %self.id, node_type = %self.kind, "unrecognized node type, running as passthrough");
            return Ok(instance);
        }

        for (param, value) in &self.parameters {
            let index = self.param_index(kind, param)?;
            let resolved = value.resolve(&kind.params()[index])?;
            instance.set_param(index, resolved);
        }

        for (param, slots) in &self.modulation {
            let index = self.param_index(kind, param)?;
            for (source, slot) in slots {
                let source = ModSource::from_name(source).ok_or_else(|| {
                    ControlError::invalid_value("modulation source", format!("unknown source '{source}'"))
                })?;
                instance.set_modulation(
                    index,
                    source,
                    ModSlot {
                        enabled: slot.enabled,
                        amount: slot.amount,
                    },
                );
            }
        }

        Ok(instance)
    }

    /// Wire form of an engine node, named and typed through `ids`.
    pub fn from_instance(node: &NodeInstance, ids: &IdMap) -> Self {
        let schema = node.kind.params();
        let parameters = schema
            .iter()
            .enumerate()
            .map(|(i, desc)| (desc.string_id.to_string(), ParamValue::from_slot(desc, node.params.get(i))))
            .collect();

        let mut modulation = BTreeMap::new();
        for (i, desc) in schema.iter().enumerate() {
            let slots: BTreeMap<String, ModSlotDef> = ModSource::ALL
                .into_iter()
                .map(|source| (source, node.modulation[i].slot(source)))
                .filter(|(_, slot)| slot.enabled || slot.amount != 0.0)
                .map(|(source, slot)| {
                    (
                        source.as_str().to_string(),
                        ModSlotDef {
                            enabled: slot.enabled,
                            amount: slot.amount,
                        },
                    )
                })
                .collect();
            if !slots.is_empty() {
                modulation.insert(desc.string_id.to_string(), slots);
            }
        }

        Self {
            id: ids.label(node.id),
            kind: ids.type_name(node.id, node.kind).to_string(),
            parameters,
            modulation,
        }
    }

    fn param_index(&self, kind: NodeKind, param: &str) -> Result<usize, ControlError> {
        kind.param_index(param).ok_or_else(|| ControlError::UnknownParameter {
            node: self.id.clone(),
            parameter: param.to_string(),
        })
    }
}

/// One LFO on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LfoDef {
    /// Whether the LFO contributes.
    pub enabled: bool,
    /// Rate in Hz.
    pub frequency: f32,
    /// Waveform name.
    pub waveform: String,
    /// Global depth.
    pub amount: f32,
}

impl Default for LfoDef {
    fn default() -> Self {
        Self::from_settings(&LfoSettings::default())
    }
}

impl LfoDef {
    fn from_settings(settings: &LfoSettings) -> Self {
        Self {
            enabled: settings.enabled,
            frequency: settings.frequency,
            waveform: settings.waveform.as_str().to_string(),
            amount: settings.amount,
        }
    }

    fn to_settings(&self) -> Result<LfoSettings, ControlError> {
        let waveform = LfoWaveform::from_name(&self.waveform).ok_or_else(|| {
            ControlError::invalid_value("lfo waveform", format!("unknown waveform '{}'", self.waveform))
        })?;
        Ok(LfoSettings {
            enabled: self.enabled,
            frequency: self.frequency,
            waveform,
            amount: self.amount,
        })
    }
}

/// One envelope follower on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvelopeDef {
    /// Whether the follower contributes.
    pub enabled: bool,
    /// Attack in seconds.
    pub attack: f32,
    /// Release in seconds.
    pub release: f32,
    /// Global depth.
    pub amount: f32,
    /// Wire id of the tracked node.
    pub source: Option<String>,
}

impl Default for EnvelopeDef {
    fn default() -> Self {
        let settings = EnvelopeSettings::default();
        Self {
            enabled: settings.enabled,
            attack: settings.attack,
            release: settings.release,
            amount: settings.amount,
            source: None,
        }
    }
}

/// Global modulation block on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModulationDef {
    /// First LFO.
    pub lfo1: LfoDef,
    /// Second LFO.
    pub lfo2: LfoDef,
    /// First envelope follower.
    pub env1: EnvelopeDef,
    /// Second envelope follower.
    pub env2: EnvelopeDef,
    /// Chaos in `[0, 1]`.
    pub chaos_level: f32,
}

impl ModulationDef {
    fn to_settings(&self, ids: &IdMap) -> Result<GlobalModulation, ControlError> {
        let envelope = |def: &EnvelopeDef| -> Result<EnvelopeSettings, ControlError> {
            let source = match def.source.as_deref() {
                None | Some("") => None,
                Some(name) => Some(
                    ids.resolve(name)
                        .ok_or_else(|| ControlError::MalformedGraph(format!("envelope source '{name}' is not a node")))?,
                ),
            };
            Ok(EnvelopeSettings {
                enabled: def.enabled,
                attack: def.attack,
                release: def.release,
                amount: def.amount,
                source,
            })
        };
        Ok(GlobalModulation {
            lfos: [self.lfo1.to_settings()?, self.lfo2.to_settings()?],
            envelopes: [envelope(&self.env1)?, envelope(&self.env2)?],
            chaos_level: self.chaos_level,
        })
    }

    fn from_settings(settings: &GlobalModulation, ids: &IdMap) -> Self {
        let envelope = |env: &EnvelopeSettings| EnvelopeDef {
            enabled: env.enabled,
            attack: env.attack,
            release: env.release,
            amount: env.amount,
            source: env.source.map(|id| ids.label(id)),
        };
        Self {
            lfo1: LfoDef::from_settings(&settings.lfos[0]),
            lfo2: LfoDef::from_settings(&settings.lfos[1]),
            env1: envelope(&settings.envelopes[0]),
            env2: envelope(&settings.envelopes[1]),
            chaos_level: settings.chaos_level,
        }
    }
}

fn default_output_channels() -> usize {
    2
}

fn default_master_gain() -> f32 {
    1.0
}

/// A whole graph on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDef {
    /// Nodes in index order.
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    /// `[channel][source][dest]` weights; empty means all zero.
    #[serde(default)]
    pub routing_matrix: Vec<Vec<Vec<f32>>>,
    /// Channel count.
    #[serde(default = "default_output_channels")]
    pub output_channels: usize,
    /// Master output gain.
    #[serde(default = "default_master_gain")]
    pub master_gain: f32,
    /// Global modulation.
    #[serde(default)]
    pub modulation: ModulationDef,
}

impl Default for GraphDef {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            routing_matrix: Vec::new(),
            output_channels: default_output_channels(),
            master_gain: default_master_gain(),
            modulation: ModulationDef::default(),
        }
    }
}

impl GraphDef {
    /// Parses a graph document.
    pub fn from_json(json: &str) -> Result<Self, ControlError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ControlError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds an engine graph, binding wire ids through `ids`.
    ///
    /// Checks every structural invariant; on error `ids` may hold bindings
    /// for nodes that were never built, so callers convert on a copy.
    pub fn to_graph(&self, ids: &mut IdMap, max_channels: usize) -> Result<AudioGraph, ControlError> {
        if !(1..=max_channels).contains(&self.output_channels) {
            return Err(ControlError::MalformedGraph(format!(
                "outputChannels {} outside 1..={max_channels}",
                self.output_channels
            )));
        }

        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for def in &self.nodes {
            if !seen.insert(def.id.as_str()) {
                return Err(ControlError::DuplicateNode(def.id.clone()));
            }
            let id = ids.assign(&def.id);
            nodes.push(def.to_instance(id)?);
            ids.set_type_name(id, &def.kind, def.node_kind());
        }

        let matrix = if self.routing_matrix.is_empty() {
            RoutingMatrix::new(self.output_channels, nodes.len())
        } else {
            let matrix = RoutingMatrix::from_nested(&self.routing_matrix, nodes.len())
                .map_err(|e| ControlError::MalformedGraph(e.to_string()))?;
            if matrix.channels() != self.output_channels {
                return Err(ControlError::MalformedGraph(format!(
                    "routingMatrix has {} channels, outputChannels is {}",
                    matrix.channels(),
                    self.output_channels
                )));
            }
            matrix
        };

        let modulation = self.modulation.to_settings(ids)?;
        if let Some(source) = modulation.envelopes.iter().filter_map(|e| e.source).find(|id| {
            !nodes.iter().any(|n| n.id == *id)
        }) {
            return Err(ControlError::MalformedGraph(format!(
                "envelope source '{}' is not in this graph",
                ids.label(source)
            )));
        }

        AudioGraph::from_parts(nodes, matrix, self.master_gain, modulation)
            .map_err(|e| ControlError::MalformedGraph(e.to_string()))
    }

    /// Wire form of an engine graph.
    pub fn from_graph(graph: &AudioGraph, ids: &IdMap) -> Self {
        Self {
            nodes: graph
                .nodes()
                .iter()
                .map(|n| NodeDef::from_instance(n, ids))
                .collect(),
            routing_matrix: graph.matrix().to_nested(),
            output_channels: graph.output_channels(),
            master_gain: graph.master_gain(),
            modulation: ModulationDef::from_settings(graph.modulation(), ids),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback_doc() -> GraphDef {
        GraphDef {
            nodes: vec![
                NodeDef::new("in", "input_mixer"),
                NodeDef::new("dly", "delay").with_param("delayTime", 0.25).with_param("feedback", 0.6),
                NodeDef::new("out", "output_mixer"),
            ],
            routing_matrix: vec![vec![vec![0.0, 1.0, 0.0], vec![0.0, 0.5, 1.0], vec![0.0; 3]]],
            output_channels: 1,
            master_gain: 0.8,
            modulation: ModulationDef::default(),
        }
    }

    #[test]
    fn enum_values_accept_names_and_indices() {
        let desc = NodeKind::Biquad.params()[0];
        assert_eq!(ParamValue::from("highpass").resolve(&desc).unwrap(), 1.0);
        assert_eq!(ParamValue::from("HIGHSHELF").resolve(&desc).unwrap(), 7.0);
        assert_eq!(ParamValue::from(2.0).resolve(&desc).unwrap(), 2.0);
        assert!(ParamValue::from("comb").resolve(&desc).is_err());
        assert_eq!(ParamValue::from_slot(&desc, 3.0), ParamValue::Text("notch".to_string()));
    }

    #[test]
    fn bool_values() {
        let desc = NodeKind::Waveshaper.params()[4];
        assert_eq!(ParamValue::from(true).resolve(&desc).unwrap(), 1.0);
        assert_eq!(ParamValue::from_slot(&desc, 1.0), ParamValue::Bool(true));
    }

    #[test]
    fn graph_document_converts() {
        let mut ids = IdMap::default();
        let graph = feedback_doc().to_graph(&mut ids, 2).unwrap();
        assert_eq!(graph.len(), 3);
        let dly = ids.resolve("dly").unwrap();
        let out = ids.resolve("out").unwrap();
        assert_eq!(graph.weight(0, dly, dly), Some(0.5));
        assert_eq!(graph.weight(0, dly, out), Some(1.0));
        assert_eq!(graph.node(dly).unwrap().param("delayTime"), Some(0.25));
        assert_eq!(graph.master_gain(), 0.8);

        let back = GraphDef::from_graph(&graph, &ids);
        assert_eq!(back.routing_matrix, feedback_doc().routing_matrix);
        assert_eq!(back.nodes[1].id, "dly");
        assert_eq!(back.nodes[1].parameters["feedback"], ParamValue::Number(0.6));
    }

    #[test]
    fn empty_matrix_means_zero() {
        let doc = GraphDef {
            nodes: vec![NodeDef::new("a", "gain"), NodeDef::new("b", "gain")],
            ..GraphDef::default()
        };
        let graph = doc.to_graph(&mut IdMap::default(), 2).unwrap();
        assert_eq!(graph.matrix().channels(), 2);
        assert_eq!(graph.matrix().node_count(), 2);
    }

    #[test]
    fn ragged_matrix_rejected() {
        let mut doc = feedback_doc();
        doc.routing_matrix[0].pop();
        let err = doc.to_graph(&mut IdMap::default(), 2).unwrap_err();
        assert!(matches!(err, ControlError::MalformedGraph(_)), "{err}");
    }

    #[test]
    fn matrix_channel_count_must_match() {
        let mut doc = feedback_doc();
        doc.output_channels = 2;
        let err = doc.to_graph(&mut IdMap::default(), 2).unwrap_err();
        assert!(matches!(err, ControlError::MalformedGraph(_)), "{err}");
    }

    #[test]
    fn out_of_range_weight_rejected() {
        let mut doc = feedback_doc();
        doc.routing_matrix[0][0][1] = 1.5;
        assert!(doc.to_graph(&mut IdMap::default(), 2).is_err());
    }

    #[test]
    fn duplicate_nodes_and_unknown_parameters() {
        let mut doc = feedback_doc();
        doc.nodes[2].id = "in".to_string();
        assert!(matches!(
            doc.to_graph(&mut IdMap::default(), 2),
            Err(ControlError::DuplicateNode(ref id)) if id == "in"
        ));

        let mut doc = feedback_doc();
        doc.nodes[1].parameters.insert("rate".to_string(), ParamValue::Number(1.0));
        assert!(matches!(
            doc.to_graph(&mut IdMap::default(), 2),
            Err(ControlError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn unrecognized_type_runs_as_passthrough() {
        let mut doc = feedback_doc();
        doc.nodes[1].kind = "reverb".to_string();
        let mut ids = IdMap::default();
        let graph = doc.to_graph(&mut ids, 2).unwrap();
        let fx = graph.node(ids.resolve("dly").unwrap()).unwrap();
        assert_eq!(fx.kind, NodeKind::Passthrough);
        assert!(fx.params.is_empty());

        let back = GraphDef::from_graph(&graph, &ids);
        assert_eq!(back.nodes[1].kind, "reverb");
        assert!(back.nodes[1].parameters.is_empty());
        assert_eq!(back.nodes[0].kind, "input_mixer");
    }

    #[test]
    fn envelope_source_must_exist() {
        let mut doc = feedback_doc();
        doc.modulation.env1.source = Some("ghost".to_string());
        assert!(matches!(
            doc.to_graph(&mut IdMap::default(), 2),
            Err(ControlError::MalformedGraph(_))
        ));

        let mut doc = feedback_doc();
        doc.modulation.env1.source = Some("dly".to_string());
        let mut ids = IdMap::default();
        let graph = doc.to_graph(&mut ids, 2).unwrap();
        assert_eq!(graph.modulation().envelopes[0].source, ids.resolve("dly"));
    }

    #[test]
    fn json_shape() {
        let json = r#"{
            "nodes": [
                {"id": "osc", "type": "oscillator", "parameters": {"waveform": "square", "frequency": 110},
                 "modulation": {"frequency": {"lfo1": {"enabled": true, "amount": 0.2}}}},
                {"id": "out", "type": "output_mixer"}
            ],
            "routingMatrix": [[[0, 1], [0, 0]]],
            "outputChannels": 1,
            "modulation": {"lfo1": {"enabled": true, "frequency": 2.0, "waveform": "triangle"}, "chaosLevel": 0.25}
        }"#;
        let doc = GraphDef::from_json(json).unwrap();
        assert_eq!(doc.master_gain, 1.0);
        let mut ids = IdMap::default();
        let graph = doc.to_graph(&mut ids, 2).unwrap();
        let osc = graph.node(ids.resolve("osc").unwrap()).unwrap();
        assert_eq!(osc.param("waveform"), Some(1.0));
        assert_eq!(osc.param("frequency"), Some(110.0));
        assert!(osc.modulation[1].is_active());
        assert_eq!(graph.modulation().lfos[0].waveform, LfoWaveform::Triangle);
        assert_eq!(graph.modulation().chaos_level, 0.25);
    }
}
