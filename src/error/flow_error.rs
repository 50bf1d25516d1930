//! Graph- and engine-level error types.

use super::NodeError;
use crate::graph::NodeId;
use thiserror::Error;

/// Graph/engine-level errors
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
    #[error("Nothing to undo")]
    UndoEmpty,
    #[error("Node error: {0}")]
    NodeError(Box<NodeError>),
}

impl From<NodeError> for FlowError {
    fn from(value: NodeError) -> Self {
        FlowError::NodeError(Box::new(value))
    }
}
