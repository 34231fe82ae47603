use crate::model::{LayerType, NodeId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Node not found: {id}")]
    NodeNotFound { id: NodeId },

    #[error("Unsupported operation on {layer} node {id}: {operation}")]
    UnsupportedOperation {
        id: NodeId,
        layer: LayerType,
        operation: &'static str,
    },

    #[error("Node {id} has no candidates to choose from")]
    NoCandidates { id: NodeId },

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
