//! Collaborator contracts consumed by the autoscaler.
//!
//! The autoscaler never reaches into the storage manager's internals. It
//! pulls a [`ClusterStatus`] snapshot and issues membership changes through
//! [`StorageManager`], and starts worker processes through [`Provisioner`].
//! Both are injected as trait objects so tests and alternative cluster
//! backends can stand in for the in-process implementation.

use std::future::Future;
use std::pin::Pin;

use crate::types::{ClusterStatus, VectorNode};

/// Boxed future alias for collaborator calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Membership and shard placement operations of the storage manager.
pub trait StorageManager: Send + Sync {
    /// Snapshot of membership, health and per-node vector counts.
    fn get_cluster_status(&self) -> BoxFuture<'_, anyhow::Result<ClusterStatus>>;

    /// Register a node. Returns `false` if the manager refused it.
    fn add_node<'a>(&'a self, node: &'a VectorNode) -> BoxFuture<'a, anyhow::Result<bool>>;

    /// Deregister a node. Returns `false` if the manager refused it.
    fn remove_node<'a>(&'a self, node_id: &'a str) -> BoxFuture<'a, anyhow::Result<bool>>;

    /// Redistribute shards across current members. Best-effort.
    fn rebalance_shards(&self) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Whether [`migrate_shards_from_node`](Self::migrate_shards_from_node)
    /// actually moves data. Read once when the autoscaler is built.
    fn supports_migration(&self) -> bool {
        false
    }

    /// Move every shard off `node_id` onto the remaining members and
    /// resolve once the move is complete.
    fn migrate_shards_from_node<'a>(
        &'a self,
        _node_id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Starts a worker process for a new node.
///
/// Fire-and-forget: returning `Ok` means the start request was issued, not
/// that the worker is serving. Readiness surfaces later through the
/// storage manager's health reporting.
pub trait Provisioner: Send + Sync {
    fn provision(&self, node: &VectorNode) -> anyhow::Result<()>;
}
