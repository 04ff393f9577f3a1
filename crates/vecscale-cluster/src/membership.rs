//! Membership and shard placement for the in-process cluster.
//!
//! Members are kept in join order, so the seed node is always first and
//! status snapshots list nodes deterministically.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use anyhow::bail;
use serde::Serialize;
use tracing::{debug, info, warn};

use vecscale_core::*;

/// In-memory view of a cluster member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub node: VectorNode,
    pub status: NodeStatus,
    pub vector_count: u64,
    pub load: f64,
    pub last_heartbeat: Timestamp,
}

#[derive(Debug, Clone)]
struct MemberRecord {
    node: VectorNode,
    vector_count: u64,
    load: f64,
    last_heartbeat: Timestamp,
    /// Set by `mark_unhealthy`, cleared by the next heartbeat.
    reported_unhealthy: bool,
}

/// In-process storage manager.
///
/// `Clone` shares the same membership table, so the API layer and the
/// autoscaler can hold handles to one cluster.
#[derive(Clone)]
pub struct LocalCluster {
    members: Arc<RwLock<Vec<MemberRecord>>>,
    /// Members silent for longer than this report as unhealthy.
    dead_timeout: Option<Duration>,
}

impl Default for LocalCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCluster {
    /// Create an empty cluster with heartbeat expiry disabled.
    pub fn new() -> Self {
        Self {
            members: Arc::new(RwLock::new(Vec::new())),
            dead_timeout: None,
        }
    }

    /// Mark members unhealthy after `timeout` without a heartbeat.
    pub fn with_dead_timeout(mut self, timeout: Duration) -> Self {
        self.dead_timeout = Some(timeout);
        self
    }

    /// Register `node1` .. `node<count>` on `base_port + i`.
    pub fn bootstrap(&self, count: u32, host: &str, base_port: u16) -> Vec<NodeId> {
        let mut joined = Vec::new();
        for i in 1..=count {
            let Some(port) = u16::try_from(i).ok().and_then(|i| base_port.checked_add(i)) else {
                warn!(index = i, base_port, "seed port out of range");
                break;
            };
            let node = VectorNode::new(format!("node{i}"), host, port);
            if self.join(node.clone()) {
                joined.push(node.id);
            }
        }
        joined
    }

    /// Add a node. Returns `false` if a member with the same ID exists.
    pub fn join(&self, node: VectorNode) -> bool {
        let mut members = self.write();
        if members.iter().any(|m| m.node.id == node.id) {
            warn!(node_id = %node.id, "join rejected: duplicate node id");
            return false;
        }

        info!(node_id = %node.id, address = %node.address(), "node joined cluster");
        members.push(MemberRecord {
            node,
            vector_count: 0,
            load: 0.0,
            last_heartbeat: epoch_millis(),
            reported_unhealthy: false,
        });
        true
    }

    /// Remove a node. Its vectors leave with it.
    pub fn leave(&self, node_id: &str) -> bool {
        let mut members = self.write();
        let before = members.len();
        members.retain(|m| m.node.id != node_id);
        let existed = members.len() != before;
        if existed {
            info!(%node_id, "node left cluster");
        }
        existed
    }

    /// Record a heartbeat, optionally updating the reported vector count
    /// and load. Returns `false` for unknown nodes.
    pub fn heartbeat(&self, node_id: &str, vector_count: Option<u64>, load: Option<f64>) -> bool {
        let mut members = self.write();
        match members.iter_mut().find(|m| m.node.id == node_id) {
            Some(m) => {
                if let Some(count) = vector_count {
                    m.vector_count = count;
                }
                if let Some(load) = load {
                    m.load = load;
                }
                m.last_heartbeat = epoch_millis();
                m.reported_unhealthy = false;
                debug!(%node_id, "heartbeat received");
                true
            }
            None => {
                warn!(%node_id, "heartbeat from unknown node");
                false
            }
        }
    }

    /// Flag a node as unavailable until its next heartbeat.
    pub fn mark_unhealthy(&self, node_id: &str) -> bool {
        let mut members = self.write();
        match members.iter_mut().find(|m| m.node.id == node_id) {
            Some(m) => {
                m.reported_unhealthy = true;
                warn!(%node_id, "node marked unhealthy");
                true
            }
            None => false,
        }
    }

    /// List all members in join order.
    pub fn list_members(&self) -> Vec<Member> {
        let now = epoch_millis();
        self.read().iter().map(|m| self.to_member(m, now)).collect()
    }

    /// Get a single member by ID.
    pub fn get_member(&self, node_id: &str) -> Option<Member> {
        let now = epoch_millis();
        self.read()
            .iter()
            .find(|m| m.node.id == node_id)
            .map(|m| self.to_member(m, now))
    }

    /// Snapshot of membership for the autoscaler.
    pub fn status(&self) -> ClusterStatus {
        let nodes = self
            .list_members()
            .into_iter()
            .map(|m| NodeSummary {
                id: m.node.id,
                status: m.status,
                vector_count: m.vector_count,
                load: m.load,
            })
            .collect();
        ClusterStatus::from_nodes(nodes)
    }

    /// Move every vector on `node_id` to the other members, filling the
    /// least-loaded ones first. Healthy members are preferred; unhealthy
    /// ones receive data only when no healthy peer is left. Returns the
    /// number of vectors moved.
    pub fn migrate_from(&self, node_id: &str) -> anyhow::Result<u64> {
        let now = epoch_millis();
        let mut members = self.write();

        let Some(source) = members.iter().position(|m| m.node.id == node_id) else {
            bail!("cannot migrate from unknown node {node_id}");
        };
        let moving = members[source].vector_count;

        let peers: Vec<usize> = (0..members.len()).filter(|&i| i != source).collect();
        let healthy: Vec<usize> = peers
            .iter()
            .copied()
            .filter(|&i| self.is_healthy(&members[i], now))
            .collect();
        let mut targets = if healthy.is_empty() {
            if !peers.is_empty() {
                warn!(%node_id, "no healthy migration target; using unhealthy members");
            }
            peers
        } else {
            healthy
        };
        if targets.is_empty() {
            if moving == 0 {
                return Ok(0);
            }
            bail!("no migration target for {moving} vectors on {node_id}");
        }
        targets.sort_by_key(|&i| members[i].vector_count);

        let share = moving / targets.len() as u64;
        let extra = (moving % targets.len() as u64) as usize;
        for (rank, &i) in targets.iter().enumerate() {
            members[i].vector_count += share + u64::from(rank < extra);
        }
        members[source].vector_count = 0;

        info!(%node_id, vectors = moving, targets = targets.len(), "shards migrated off node");
        Ok(moving)
    }

    /// Even out vector counts across all members.
    pub fn rebalance(&self) {
        let mut members = self.write();
        if members.is_empty() {
            return;
        }

        let total: u64 = members.iter().map(|m| m.vector_count).sum();
        let n = members.len() as u64;
        let share = total / n;
        let extra = (total % n) as usize;
        for (i, m) in members.iter_mut().enumerate() {
            m.vector_count = share + u64::from(i < extra);
        }

        info!(members = n, vectors = total, "shards rebalanced");
    }

    fn is_healthy(&self, m: &MemberRecord, now: Timestamp) -> bool {
        let expired = self
            .dead_timeout
            .is_some_and(|t| now.saturating_sub(m.last_heartbeat) > t.as_millis() as u64);
        !(m.reported_unhealthy || expired)
    }

    fn to_member(&self, m: &MemberRecord, now: Timestamp) -> Member {
        let status = if self.is_healthy(m, now) {
            NodeStatus::Healthy
        } else {
            NodeStatus::Unhealthy
        };

        Member {
            node: m.node.clone(),
            status,
            vector_count: m.vector_count,
            load: m.load,
            last_heartbeat: m.last_heartbeat,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<MemberRecord>> {
        self.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<MemberRecord>> {
        self.members.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageManager for LocalCluster {
    fn get_cluster_status(&self) -> BoxFuture<'_, anyhow::Result<ClusterStatus>> {
        Box::pin(async move { Ok(self.status()) })
    }

    fn add_node<'a>(&'a self, node: &'a VectorNode) -> BoxFuture<'a, anyhow::Result<bool>> {
        Box::pin(async move { Ok(self.join(node.clone())) })
    }

    fn remove_node<'a>(&'a self, node_id: &'a str) -> BoxFuture<'a, anyhow::Result<bool>> {
        Box::pin(async move { Ok(self.leave(node_id)) })
    }

    fn rebalance_shards(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            self.rebalance();
            Ok(())
        })
    }

    fn supports_migration(&self) -> bool {
        true
    }

    fn migrate_shards_from_node<'a>(
        &'a self,
        node_id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move { self.migrate_from(node_id).map(|_| ()) })
    }
}
