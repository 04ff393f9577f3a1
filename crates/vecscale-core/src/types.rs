//! Domain types shared across vecscale crates.
//!
//! Cluster status is produced by the storage manager and read by the
//! autoscaler; scaling events are produced by the autoscaler. All types
//! serialize to JSON for the operator API.

use serde::{Deserialize, Serialize};

/// Unique identifier for a node in the cluster.
pub type NodeId = String;

/// Milliseconds since the Unix epoch. Zero means "never".
pub type Timestamp = u64;

/// The seed node every cluster is bootstrapped with. It is never removed.
pub const SEED_NODE_ID: &str = "node1";

// ── Nodes ──────────────────────────────────────────────────────────

/// Identity record for a vector storage worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VectorNode {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
}

impl VectorNode {
    pub fn new(id: impl Into<NodeId>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
        }
    }

    /// `host:port` listen address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Availability of a node as reported by the storage manager.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Healthy,
    Unhealthy,
}

/// Per-node entry of a cluster status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSummary {
    pub id: NodeId,
    pub status: NodeStatus,
    /// Number of vectors stored on this node.
    pub vector_count: u64,
    /// Load factor reported by the node (0.0 – 1.0).
    pub load: f64,
}

// ── Cluster status ─────────────────────────────────────────────────

/// Point-in-time view of cluster membership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClusterStatus {
    pub total_nodes: u32,
    pub healthy_nodes: u32,
    /// Nodes in membership order.
    pub nodes: Vec<NodeSummary>,
}

impl ClusterStatus {
    /// Build a snapshot from node summaries, deriving the counts.
    pub fn from_nodes(nodes: Vec<NodeSummary>) -> Self {
        let healthy = nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Healthy)
            .count();
        Self {
            total_nodes: nodes.len() as u32,
            healthy_nodes: healthy as u32,
            nodes,
        }
    }

    /// A snapshot is usable when it reports at least one node and its
    /// healthy count does not exceed its total.
    pub fn is_consistent(&self) -> bool {
        self.total_nodes > 0 && self.healthy_nodes <= self.total_nodes
    }
}

// ── Scaling events ─────────────────────────────────────────────────

/// Direction of a completed scaling action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScalingAction {
    ScaleUp,
    ScaleDown,
}

impl ScalingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingAction::ScaleUp => "scale_up",
            ScalingAction::ScaleDown => "scale_down",
        }
    }
}

impl std::fmt::Display for ScalingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful scaling action, recorded for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScalingEvent {
    pub timestamp: Timestamp,
    pub action: ScalingAction,
    pub reason: String,
    pub node_id: NodeId,
}

/// Current wall-clock time in epoch milliseconds.
pub fn epoch_millis() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Timestamp
}
