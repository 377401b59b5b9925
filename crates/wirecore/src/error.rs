use crate::graph::{EdgeId, NodeId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures scoped to a single node execution
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("input validation failed: missing required slot '{0}'")]
    MissingInput(String),

    #[error("input validation failed: unknown slot '{0}'")]
    UnknownInput(String),

    #[error("input validation failed for '{slot}': expected {expected}, got {actual}")]
    InputType {
        slot: String,
        expected: String,
        actual: String,
    },

    #[error("output validation failed: expected {expected}, got {actual}")]
    OutputType { expected: String, actual: String },

    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

/// Failures in the graph structure or an execution plan built from it
#[derive(Error, Debug, Clone)]
pub enum GraphError {
    #[error("unregistered node type: {0}")]
    UnregisteredNodeType(String),

    #[error("node not found: {0}")]
    MissingNode(NodeId),

    #[error("edge not found: {0}")]
    MissingEdge(EdgeId),

    #[error("cyclic graph: cycle reachable from {start}")]
    CyclicGraph { start: NodeId },

    #[error("duplicate slot binding on node {node}: '{slot}'")]
    DuplicateSlotBinding { node: NodeId, slot: String },

    #[error("invalid connection: {0}")]
    InvalidConnection(String),
}
