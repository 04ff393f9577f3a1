//! Test doubles for the storage manager and provisioner contracts.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vecscale_core::*;

/// Scriptable storage manager that journals every call.
pub(crate) struct FakeCluster {
    nodes: Mutex<Vec<NodeSummary>>,
    journal: Mutex<Vec<String>>,
    migration: bool,
    reject_adds: AtomicBool,
    hang_adds: AtomicBool,
    reject_removals: AtomicBool,
    fail_migrations: AtomicBool,
    hang_migrations: AtomicBool,
    hang_removals: AtomicBool,
    /// Milliseconds each migration takes.
    migration_delay_ms: AtomicU64,
    fail_status: AtomicBool,
    panic_next_status: AtomicBool,
}

impl FakeCluster {
    pub(crate) fn with_nodes(nodes: &[(&str, u64)]) -> Self {
        let nodes = nodes
            .iter()
            .map(|(id, vector_count)| NodeSummary {
                id: id.to_string(),
                status: NodeStatus::Healthy,
                vector_count: *vector_count,
                load: 0.0,
            })
            .collect();

        Self {
            nodes: Mutex::new(nodes),
            journal: Mutex::new(Vec::new()),
            migration: true,
            reject_adds: AtomicBool::new(false),
            hang_adds: AtomicBool::new(false),
            reject_removals: AtomicBool::new(false),
            fail_migrations: AtomicBool::new(false),
            hang_migrations: AtomicBool::new(false),
            hang_removals: AtomicBool::new(false),
            migration_delay_ms: AtomicU64::new(0),
            fail_status: AtomicBool::new(false),
            panic_next_status: AtomicBool::new(false),
        }
    }

    pub(crate) fn without_migration(mut self) -> Self {
        self.migration = false;
        self
    }

    pub(crate) fn reject_adds(&self) {
        self.reject_adds.store(true, Ordering::SeqCst);
    }

    pub(crate) fn hang_adds(&self) {
        self.hang_adds.store(true, Ordering::SeqCst);
    }

    pub(crate) fn reject_removals(&self) {
        self.reject_removals.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_migrations(&self) {
        self.fail_migrations.store(true, Ordering::SeqCst);
    }

    pub(crate) fn hang_migrations(&self) {
        self.hang_migrations.store(true, Ordering::SeqCst);
    }

    pub(crate) fn hang_removals(&self) {
        self.hang_removals.store(true, Ordering::SeqCst);
    }

    pub(crate) fn slow_migrations(&self, delay: Duration) {
        self.migration_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Make the next `get_cluster_status` call panic.
    pub(crate) fn panic_next_status(&self) {
        self.panic_next_status.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_status_failing(&self, failing: bool) {
        self.fail_status.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn mark_unhealthy(&self, node_id: &str) {
        let mut nodes = self.nodes.lock().unwrap();
        if let Some(n) = nodes.iter_mut().find(|n| n.id == node_id) {
            n.status = NodeStatus::Unhealthy;
        }
    }

    pub(crate) fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    fn log(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }
}

impl StorageManager for FakeCluster {
    fn get_cluster_status(&self) -> BoxFuture<'_, anyhow::Result<ClusterStatus>> {
        Box::pin(async move {
            self.log("get_cluster_status".to_string());
            if self.panic_next_status.swap(false, Ordering::SeqCst) {
                panic!("status handler crashed");
            }
            if self.fail_status.load(Ordering::SeqCst) {
                anyhow::bail!("storage manager unreachable");
            }
            Ok(ClusterStatus::from_nodes(self.nodes.lock().unwrap().clone()))
        })
    }

    fn add_node<'a>(&'a self, node: &'a VectorNode) -> BoxFuture<'a, anyhow::Result<bool>> {
        Box::pin(async move {
            self.log(format!("add_node:{}", node.id));
            if self.hang_adds.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.reject_adds.load(Ordering::SeqCst) {
                return Ok(false);
            }
            self.nodes.lock().unwrap().push(NodeSummary {
                id: node.id.clone(),
                status: NodeStatus::Healthy,
                vector_count: 0,
                load: 0.0,
            });
            Ok(true)
        })
    }

    fn remove_node<'a>(&'a self, node_id: &'a str) -> BoxFuture<'a, anyhow::Result<bool>> {
        Box::pin(async move {
            self.log(format!("remove_node:{node_id}"));
            if self.hang_removals.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.reject_removals.load(Ordering::SeqCst) {
                return Ok(false);
            }
            let mut nodes = self.nodes.lock().unwrap();
            let before = nodes.len();
            nodes.retain(|n| n.id != node_id);
            Ok(nodes.len() != before)
        })
    }

    fn rebalance_shards(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            self.log("rebalance_shards".to_string());
            Ok(())
        })
    }

    fn supports_migration(&self) -> bool {
        self.migration
    }

    fn migrate_shards_from_node<'a>(
        &'a self,
        node_id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.log(format!("migrate_shards_from_node:{node_id}"));
            if self.hang_migrations.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            let delay = self.migration_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.fail_migrations.load(Ordering::SeqCst) {
                anyhow::bail!("shard copy interrupted");
            }
            Ok(())
        })
    }
}

/// Provisioner that records requests, optionally into a cluster journal.
#[derive(Default)]
pub(crate) struct RecordingProvisioner {
    provisioned: Mutex<Vec<VectorNode>>,
    journal: Option<Arc<FakeCluster>>,
    fail: bool,
}

impl RecordingProvisioner {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Write `provision:<id>` into `cluster`'s journal on every request.
    pub(crate) fn journaling(cluster: &Arc<FakeCluster>) -> Self {
        Self {
            journal: Some(cluster.clone()),
            ..Self::default()
        }
    }

    pub(crate) fn provisioned(&self) -> Vec<VectorNode> {
        self.provisioned.lock().unwrap().clone()
    }
}

impl Provisioner for RecordingProvisioner {
    fn provision(&self, node: &VectorNode) -> anyhow::Result<()> {
        if let Some(cluster) = &self.journal {
            cluster.log(format!("provision:{}", node.id));
        }
        if self.fail {
            anyhow::bail!("worker binary missing");
        }
        self.provisioned.lock().unwrap().push(node.clone());
        Ok(())
    }
}
