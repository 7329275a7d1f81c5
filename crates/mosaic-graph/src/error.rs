use mosaic_core::{EdgeId, NodeId};
use thiserror::Error;

/// Why a graph mutation was refused.
///
/// The interactive entry points turn every one of these into a no-op; the
/// `try_*` variants surface them for callers that want to know.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),
    #[error("node id {0} already exists")]
    DuplicateNode(NodeId),
    #[error("node {0} is not a group")]
    NotAContainer(NodeId),
    #[error("making {parent} the parent of {child} would create a cycle")]
    ParentCycle { child: NodeId, parent: NodeId },
    #[error("edge from {0} to itself")]
    SelfLoop(NodeId),
    #[error("grouping needs at least two nodes, got {0}")]
    DegenerateSelection(usize),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read or write settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}
