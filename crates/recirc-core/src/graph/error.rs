//! Graph mutation errors.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use core::fmt;

use super::NodeId;

/// Errors returned by graph and engine mutations.
///
/// None of these is fatal: a rejected mutation leaves the graph as it was.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// No node has this id.
    UnknownNode(NodeId),
    /// The node's type has no parameter with this id.
    UnknownParameter {
        /// Node addressed.
        node: NodeId,
        /// Parameter id requested.
        parameter: String,
    },
    /// A node with this id already exists.
    DuplicateNode(NodeId),
    /// Channel index outside the matrix.
    ChannelOutOfRange {
        /// Channel requested.
        channel: usize,
        /// Channels available.
        channels: usize,
    },
    /// Output channel count outside `1..=max`.
    InvalidChannelCount {
        /// Count requested.
        requested: usize,
        /// Largest count allowed.
        max: usize,
    },
    /// Matrix dimensions disagree with the node or channel count.
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        found: usize,
    },
    /// A routing weight is non-finite or outside `[0, 1]`.
    InvalidWeight {
        /// Channel of the bad weight.
        channel: usize,
        /// Source index.
        source: usize,
        /// Destination index.
        dest: usize,
    },
    /// A scalar setting is non-finite or out of range.
    InvalidValue {
        /// Setting name.
        what: &'static str,
        /// Rejected value.
        value: f32,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "unknown node {id}"),
            Self::UnknownParameter { node, parameter } => {
                write!(f, "node {node} has no parameter '{parameter}'")
            }
            Self::DuplicateNode(id) => write!(f, "node {id} already exists"),
            Self::ChannelOutOfRange { channel, channels } => {
                write!(f, "channel {channel} out of range (graph has {channels})")
            }
            Self::InvalidChannelCount { requested, max } => {
                write!(f, "output channel count {requested} not in 1..={max}")
            }
            Self::DimensionMismatch { expected, found } => {
                write!(f, "routing matrix dimension mismatch: expected {expected}, found {found}")
            }
            Self::InvalidWeight { channel, source, dest } => {
                write!(f, "invalid routing weight at [{channel}][{source}][{dest}]")
            }
            Self::InvalidValue { what, value } => write!(f, "invalid {what}: {value}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GraphError {}
