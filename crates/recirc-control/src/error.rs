//! Error types for control-plane operations.

use std::path::PathBuf;
use thiserror::Error;

use recirc_core::GraphError;

use crate::ids::IdMap;
use crate::message::ControlMessage;

/// Errors that can occur while decoding, validating or applying control
/// messages, and while loading settings.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A message could not be decoded
    #[error("failed to decode message: {0}")]
    Decode(#[from] serde_json::Error),

    /// No node has this id
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// The node's type has no such parameter
    #[error("unknown parameter '{parameter}' on node '{node}'")]
    UnknownParameter {
        /// Node addressed.
        node: String,
        /// Parameter id requested.
        parameter: String,
    },

    /// A value was out of range or of the wrong type
    #[error("invalid value for {what}: {reason}")]
    InvalidValue {
        /// What the value was for.
        what: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A graph document broke a structural invariant
    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    /// A node with this id already exists
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    /// The message needs an initialized processor
    #[error("processor not initialized")]
    NotInitialized,

    /// The command queue is full; the message is handed back
    #[error("command queue full")]
    QueueFull(Box<ControlMessage>),

    /// The other end of a queue was dropped
    #[error("processor disconnected")]
    Disconnected,

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl ControlError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ControlError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ControlError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(what: impl Into<String>, reason: impl Into<String>) -> Self {
        ControlError::InvalidValue {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Translates a core graph error, naming nodes by their wire ids.
    pub fn from_graph(err: GraphError, ids: &IdMap) -> Self {
        match err {
            GraphError::UnknownNode(id) => ControlError::UnknownNode(ids.label(id)),
            GraphError::UnknownParameter { node, parameter } => ControlError::UnknownParameter {
                node: ids.label(node),
                parameter,
            },
            GraphError::DuplicateNode(id) => ControlError::DuplicateNode(ids.label(id)),
            GraphError::DimensionMismatch { .. } | GraphError::InvalidWeight { .. } => {
                ControlError::MalformedGraph(err.to_string())
            }
            GraphError::ChannelOutOfRange { .. } => ControlError::invalid_value("channel", err.to_string()),
            GraphError::InvalidChannelCount { .. } => {
                ControlError::invalid_value("outputChannels", err.to_string())
            }
            GraphError::InvalidValue { what, .. } => ControlError::invalid_value(what, err.to_string()),
        }
    }

    /// Node the error concerns, if it is node-level.
    ///
    /// Node-level errors are reported as `NODE_ERROR`; everything else as
    /// `WORKLET_ERROR`.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            ControlError::UnknownNode(id) | ControlError::DuplicateNode(id) => Some(id),
            ControlError::UnknownParameter { node, .. } => Some(node),
            _ => None,
        }
    }
}
