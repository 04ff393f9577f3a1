//! Scale-down executor: pick the cheapest node to drain, migrate its data,
//! deregister it, then rebalance.
//!
//! Order matters. Migration must finish before the node leaves membership,
//! and rebalancing runs only against the shrunken membership.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use vecscale_core::*;

use crate::collab;
use crate::error::{ScaleError, ScaleResult};
use crate::ledger::ScalingLedger;

/// Removes one node from the cluster.
pub struct ScaleDownExecutor {
    cluster: Arc<dyn StorageManager>,
    ledger: Arc<Mutex<ScalingLedger>>,
    seed_node: NodeId,
    call_timeout: Duration,
    /// Resolved from `StorageManager::supports_migration` at construction.
    migration: bool,
}

impl ScaleDownExecutor {
    pub fn new(
        cluster: Arc<dyn StorageManager>,
        ledger: Arc<Mutex<ScalingLedger>>,
        seed_node: impl Into<NodeId>,
        call_timeout: Duration,
    ) -> Self {
        let migration = cluster.supports_migration();
        Self {
            cluster,
            ledger,
            seed_node: seed_node.into(),
            call_timeout,
            migration,
        }
    }

    pub fn migration_enabled(&self) -> bool {
        self.migration
    }

    /// Remove the node holding the fewest vectors.
    ///
    /// Re-reads cluster status first; the snapshot that triggered the
    /// decision may be stale. Returns `NoRemovableNode` or `AtMinimum`
    /// without side effects when the cluster cannot shrink.
    pub async fn execute(
        &self,
        reason: &str,
        current_node_count: u32,
        min_nodes: u32,
    ) -> ScaleResult<NodeId> {
        let status = collab::call(
            "get_cluster_status",
            self.call_timeout,
            self.cluster.get_cluster_status(),
        )
        .await?;

        let node_count = current_node_count.min(status.total_nodes);
        let Some(candidate) = select_removal_candidate(&status.nodes, &self.seed_node) else {
            info!("scale down skipped: no removable node");
            return Err(ScaleError::NoRemovableNode);
        };
        if node_count <= min_nodes {
            info!(nodes = node_count, min_nodes, "scale down skipped: already at min_nodes");
            return Err(ScaleError::AtMinimum {
                nodes: node_count,
                min_nodes,
            });
        }

        let node_id = candidate.id.clone();
        info!(
            %node_id,
            vector_count = candidate.vector_count,
            %reason,
            "scaling down: preparing to remove node"
        );

        if self.migration {
            collab::call(
                "migrate_shards_from_node",
                self.call_timeout,
                self.cluster.migrate_shards_from_node(&node_id),
            )
            .await
            .inspect_err(|e| error!(%node_id, error = %e, "failed to scale down: migration failed"))?;
        } else {
            warn!(%node_id, "storage manager cannot migrate shards; removing node without migration");
        }

        let removed = collab::call(
            "remove_node",
            self.call_timeout,
            self.cluster.remove_node(&node_id),
        )
        .await
        .inspect_err(|e| error!(%node_id, error = %e, "failed to scale down: removal error"))?;

        if !removed {
            error!(%node_id, "failed to scale down: storage manager rejected removal");
            return Err(ScaleError::RemovalRejected { node_id });
        }

        if let Err(e) = collab::call(
            "rebalance_shards",
            self.call_timeout,
            self.cluster.rebalance_shards(),
        )
        .await
        {
            warn!(%node_id, error = %e, "shard rebalance after removal failed");
        }

        self.ledger.lock().await.record(ScalingEvent {
            timestamp: epoch_millis(),
            action: ScalingAction::ScaleDown,
            reason: reason.to_string(),
            node_id: node_id.clone(),
        });

        info!(%node_id, "scaled down: node removed");
        Ok(node_id)
    }
}

/// The non-seed node with the fewest vectors; the first one listed wins a tie.
pub fn select_removal_candidate<'a>(
    nodes: &'a [NodeSummary],
    seed_node: &str,
) -> Option<&'a NodeSummary> {
    nodes
        .iter()
        .filter(|n| n.id != seed_node)
        .min_by_key(|n| n.vector_count)
}
