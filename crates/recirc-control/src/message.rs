//! Control messages and notifications.
//!
//! Both directions use the same envelope:
//!
//! ```json
//! {"type": "UPDATE_PARAMETER", "payload": {"nodeId": "dly", "parameterId": "feedback", "value": 0.7}}
//! ```
//!
//! Payload fields are camelCase. Messages without fields still carry an
//! empty payload object (`"payload": {}`).

use serde::{Deserialize, Serialize};

use crate::error::ControlError;
use crate::wire::{GraphDef, NodeDef, ParamValue};

/// `dataType` of an offline render result.
pub const OFFLINE_RENDER: &str = "offlineRender";

/// Inbound message, applied between blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ControlMessage {
    /// Builds the engine and installs the first graph.
    InitProcessor {
        /// Initial graph.
        #[serde(default)]
        graph: GraphDef,
        /// Overrides the configured sample rate.
        #[serde(default)]
        sample_rate: Option<f32>,
        /// Overrides the configured channel ceiling.
        #[serde(default)]
        max_channels: Option<usize>,
    },
    /// Replaces the whole graph.
    UpdateGraph {
        /// New graph.
        graph: GraphDef,
    },
    /// Adds one node.
    AddNode {
        /// Node to add; its id must be new.
        node_instance: NodeDef,
    },
    /// Removes one node.
    RemoveNode {
        /// Wire id.
        node_id: String,
    },
    /// Sets one node parameter.
    UpdateParameter {
        /// Wire id.
        node_id: String,
        /// Parameter id.
        parameter_id: String,
        /// New value.
        value: ParamValue,
    },
    /// Sets a graph-wide parameter (`masterGain`, `chaosLevel`,
    /// `lfo1.frequency`, `env2.source`, ...).
    SetGlobalParameter {
        /// Global parameter id.
        parameter_id: String,
        /// New value.
        value: ParamValue,
    },
    /// Changes the channel count.
    SetOutputChannels {
        /// New count.
        output_channels: usize,
    },
    /// Sets one routing weight.
    SetMatrixWeight {
        /// Channel.
        channel: usize,
        /// Source wire id.
        source_id: String,
        /// Destination wire id.
        dest_id: String,
        /// Weight in `[0, 1]`.
        weight: f32,
    },
    /// Edits one modulation slot of one node parameter.
    SetModulation {
        /// Wire id.
        node_id: String,
        /// Parameter id.
        parameter_id: String,
        /// Source name (`lfo1`, `lfo2`, `env1`, `env2`).
        source: String,
        /// Whether the slot contributes.
        enabled: bool,
        /// Depth.
        amount: f32,
    },
    /// Asks for a status report.
    CheckProcessorStatus {},
    /// Renders the current graph offline with silent input.
    RenderOffline {
        /// Length in seconds.
        duration_seconds: f32,
    },
}

impl ControlMessage {
    /// Decodes a JSON message.
    pub fn from_json(json: &str) -> Result<Self, ControlError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encodes as compact JSON.
    pub fn to_json(&self) -> Result<String, ControlError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire name of the message type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitProcessor { .. } => "INIT_PROCESSOR",
            Self::UpdateGraph { .. } => "UPDATE_GRAPH",
            Self::AddNode { .. } => "ADD_NODE",
            Self::RemoveNode { .. } => "REMOVE_NODE",
            Self::UpdateParameter { .. } => "UPDATE_PARAMETER",
            Self::SetGlobalParameter { .. } => "SET_GLOBAL_PARAMETER",
            Self::SetOutputChannels { .. } => "SET_OUTPUT_CHANNELS",
            Self::SetMatrixWeight { .. } => "SET_MATRIX_WEIGHT",
            Self::SetModulation { .. } => "SET_MODULATION",
            Self::CheckProcessorStatus {} => "CHECK_PROCESSOR_STATUS",
            Self::RenderOffline { .. } => "RENDER_OFFLINE",
        }
    }
}

/// Offline render result carried by `DATA_AVAILABLE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderData {
    /// Sample rate of the audio.
    pub sample_rate: f32,
    /// Per-channel samples.
    pub channels: Vec<Vec<f32>>,
}

/// Outbound notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Notification {
    /// `INIT_PROCESSOR` succeeded.
    ProcessorReady {},
    /// Answer to `CHECK_PROCESSOR_STATUS`.
    ProcessorStatus {
        /// Whether an engine exists.
        is_initialized: bool,
        /// Nodes in the graph.
        graph_node_count: usize,
        /// Blocks processed so far.
        blocks_processed: u64,
        /// Notifications lost to a full queue.
        dropped_notifications: u64,
        /// Sample rate in Hz.
        sample_rate: f32,
        /// Frames per block.
        block_size: usize,
        /// Active channel count.
        output_channels: usize,
    },
    /// The graph changed as a whole.
    GraphUpdated {
        /// Graph after the change.
        graph: GraphDef,
    },
    /// A node was added.
    NodeAdded {
        /// Node as stored.
        node_instance: NodeDef,
    },
    /// A node was removed.
    NodeRemoved {
        /// Wire id.
        node_id: String,
    },
    /// A parameter changed. `nodeId` is null for global parameters.
    ParameterUpdated {
        /// Wire id, or `None` for a global parameter.
        node_id: Option<String>,
        /// Parameter id.
        parameter_id: String,
        /// Value as stored.
        value: ParamValue,
    },
    /// A message was rejected.
    WorkletError {
        /// Description.
        message: String,
    },
    /// A node-level failure.
    NodeError {
        /// Wire id.
        node_id: String,
        /// Description.
        message: String,
    },
    /// Bulk data, such as an offline render.
    DataAvailable {
        /// Payload kind (`offlineRender`).
        data_type: String,
        /// Payload.
        data: RenderData,
    },
}

impl Notification {
    /// Error notification for a rejected message.
    pub fn from_error(err: &ControlError) -> Self {
        match err.node_id() {
            Some(node) => Notification::NodeError {
                node_id: node.to_string(),
                message: err.to_string(),
            },
            None => Notification::WorkletError {
                message: err.to_string(),
            },
        }
    }

    /// Encodes as compact JSON.
    pub fn to_json(&self) -> Result<String, ControlError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a JSON notification.
    pub fn from_json(json: &str) -> Result<Self, ControlError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns `true` for `WORKLET_ERROR` and `NODE_ERROR`.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::WorkletError { .. } | Self::NodeError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_update_parameter() {
        let json = r#"{"type":"UPDATE_PARAMETER","payload":{"nodeId":"dly","parameterId":"feedback","value":0.7}}"#;
        let msg = ControlMessage::from_json(json).unwrap();
        assert_eq!(
            msg,
            ControlMessage::UpdateParameter {
                node_id: "dly".to_string(),
                parameter_id: "feedback".to_string(),
                value: ParamValue::Number(0.7),
            }
        );
        assert_eq!(msg.name(), "UPDATE_PARAMETER");
    }

    #[test]
    fn decode_status_probe_and_init() {
        let msg = ControlMessage::from_json(r#"{"type":"CHECK_PROCESSOR_STATUS","payload":{}}"#).unwrap();
        assert_eq!(msg, ControlMessage::CheckProcessorStatus {});

        let msg = ControlMessage::from_json(
            r#"{"type":"INIT_PROCESSOR","payload":{"graph":{"nodes":[]},"sampleRate":44100}}"#,
        )
        .unwrap();
        let ControlMessage::InitProcessor {
            graph,
            sample_rate,
            max_channels,
        } = msg
        else {
            panic!("wrong variant");
        };
        assert!(graph.nodes.is_empty());
        assert_eq!(sample_rate, Some(44100.0));
        assert_eq!(max_channels, None);
    }

    #[test]
    fn unknown_type_is_decode_error() {
        let err = ControlMessage::from_json(r#"{"type":"SELF_DESTRUCT","payload":{}}"#).unwrap_err();
        assert!(matches!(err, ControlError::Decode(_)));
        assert!(ControlMessage::from_json("not json").is_err());
    }

    #[test]
    fn encode_notifications() {
        let json = Notification::NodeRemoved {
            node_id: "a".to_string(),
        }
        .to_json()
        .unwrap();
        assert_eq!(json, r#"{"type":"NODE_REMOVED","payload":{"nodeId":"a"}}"#);

        let json = Notification::ProcessorReady {}.to_json().unwrap();
        assert_eq!(json, r#"{"type":"PROCESSOR_READY","payload":{}}"#);

        let json = Notification::ParameterUpdated {
            node_id: None,
            parameter_id: "masterGain".to_string(),
            value: ParamValue::Number(0.5),
        }
        .to_json()
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"PARAMETER_UPDATED","payload":{"nodeId":null,"parameterId":"masterGain","value":0.5}}"#
        );
    }

    #[test]
    fn errors_split_by_level() {
        let node = Notification::from_error(&ControlError::UnknownNode("x".to_string()));
        assert!(matches!(node, Notification::NodeError { ref node_id, .. } if node_id == "x"));
        let global = Notification::from_error(&ControlError::NotInitialized);
        assert_eq!(
            global,
            Notification::WorkletError {
                message: "processor not initialized".to_string()
            }
        );
        assert!(global.is_error());
    }
}
