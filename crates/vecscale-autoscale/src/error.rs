//! Error types for scaling operations.

use std::time::Duration;

use thiserror::Error;

use vecscale_core::{CoreError, NodeId};

/// Result type alias for scaling operations.
pub type ScaleResult<T> = Result<T, ScaleError>;

/// Errors that can occur while deciding or executing a scaling action.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("{op} failed: {message}")]
    Collaborator { op: &'static str, message: String },

    #[error("{op} timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },

    #[error("failed to provision {node_id}: {message}")]
    Provision { node_id: NodeId, message: String },

    #[error("storage manager rejected registration of {node_id}")]
    RegistrationRejected { node_id: NodeId },

    #[error("storage manager rejected removal of {node_id}")]
    RemovalRejected { node_id: NodeId },

    #[error("no port left for node{index} above base port {base_port}")]
    PortExhausted { index: u32, base_port: u16 },

    #[error("no removable node in cluster")]
    NoRemovableNode,

    #[error("cluster already at minimum size ({nodes} <= {min_nodes})")]
    AtMinimum { nodes: u32, min_nodes: u32 },

    #[error(transparent)]
    Config(#[from] CoreError),
}

impl ScaleError {
    /// Policy abstentions are expected outcomes, not failures of the
    /// cluster or its collaborators.
    pub fn is_abstention(&self) -> bool {
        matches!(self, ScaleError::NoRemovableNode | ScaleError::AtMinimum { .. })
    }
}
