//! Scale-up executor: provision a worker, then register it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info};

use vecscale_core::*;

use crate::collab;
use crate::error::{ScaleError, ScaleResult};
use crate::ledger::ScalingLedger;

/// Adds one node to the cluster.
pub struct ScaleUpExecutor {
    cluster: Arc<dyn StorageManager>,
    provisioner: Arc<dyn Provisioner>,
    ledger: Arc<Mutex<ScalingLedger>>,
    host: String,
    base_port: u16,
    call_timeout: Duration,
}

impl ScaleUpExecutor {
    pub fn new(
        cluster: Arc<dyn StorageManager>,
        provisioner: Arc<dyn Provisioner>,
        ledger: Arc<Mutex<ScalingLedger>>,
        host: impl Into<String>,
        base_port: u16,
        call_timeout: Duration,
    ) -> Self {
        Self {
            cluster,
            provisioner,
            ledger,
            host: host.into(),
            base_port,
            call_timeout,
        }
    }

    /// Provision and register `node<current_node_count + 1>`.
    ///
    /// The cooldown and history are only touched once the storage manager
    /// accepts the node. A provisioning failure skips registration.
    pub async fn execute(&self, reason: &str, current_node_count: u32) -> ScaleResult<NodeId> {
        let node = next_node(&self.host, self.base_port, current_node_count)?;
        info!(node_id = %node.id, address = %node.address(), %reason, "scaling up");

        if let Err(e) = self.provisioner.provision(&node) {
            error!(node_id = %node.id, error = %e, "failed to scale up: provisioning failed");
            return Err(ScaleError::Provision {
                node_id: node.id,
                message: format!("{e:#}"),
            });
        }

        let accepted =
            match collab::call("add_node", self.call_timeout, self.cluster.add_node(&node)).await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(node_id = %node.id, error = %e, "failed to scale up: registration error");
                    return Err(e);
                }
            };

        if !accepted {
            error!(node_id = %node.id, "failed to scale up: storage manager rejected node");
            return Err(ScaleError::RegistrationRejected { node_id: node.id });
        }

        self.ledger.lock().await.record(ScalingEvent {
            timestamp: epoch_millis(),
            action: ScalingAction::ScaleUp,
            reason: reason.to_string(),
            node_id: node.id.clone(),
        });

        info!(node_id = %node.id, "scaled up: node added");
        Ok(node.id)
    }
}

/// Identity for the node added after `current_node_count` nodes.
///
/// Derived from the count alone, so an ID freed by an out-of-order removal
/// can be handed out again while a higher-numbered node still exists.
pub fn next_node(host: &str, base_port: u16, current_node_count: u32) -> ScaleResult<VectorNode> {
    let index = current_node_count.saturating_add(1);
    let port = u32::from(base_port)
        .checked_add(index)
        .and_then(|p| u16::try_from(p).ok())
        .ok_or(ScaleError::PortExhausted { index, base_port })?;

    Ok(VectorNode::new(format!("node{index}"), host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCluster, RecordingProvisioner};

    fn executor(
        cluster: &Arc<FakeCluster>,
        provisioner: &Arc<RecordingProvisioner>,
        ledger: &Arc<Mutex<ScalingLedger>>,
    ) -> ScaleUpExecutor {
        ScaleUpExecutor::new(
            cluster.clone(),
            provisioner.clone(),
            ledger.clone(),
            "localhost",
            8000,
            Duration::from_millis(100),
        )
    }

    #[test]
    fn next_node_derives_id_and_port() {
        let node = next_node("localhost", 8000, 3).unwrap();
        assert_eq!(node, VectorNode::new("node4", "localhost", 8004));
    }

    #[test]
    fn next_node_rejects_port_overflow() {
        let err = next_node("localhost", 65_530, 10).unwrap_err();
        assert!(matches!(err, ScaleError::PortExhausted { index: 11, .. }));
    }

    #[tokio::test]
    async fn provisions_before_registering() {
        let cluster = Arc::new(FakeCluster::with_nodes(&[("node1", 0), ("node2", 0)]));
        let provisioner = Arc::new(RecordingProvisioner::journaling(&cluster));
        let ledger = Arc::new(Mutex::new(ScalingLedger::new()));

        let before = epoch_millis();
        let node_id = executor(&cluster, &provisioner, &ledger)
            .execute("low healthy nodes", 2)
            .await
            .unwrap();

        assert_eq!(node_id, "node3");
        assert_eq!(provisioner.provisioned(), vec![VectorNode::new("node3", "localhost", 8003)]);
        assert_eq!(cluster.journal(), vec!["provision:node3", "add_node:node3"]);

        let ledger = ledger.lock().await;
        assert!(ledger.cooldown().last_scale_up >= before);
        assert!(ledger.cooldown().last_scale_up <= epoch_millis());
        let events = ledger.history().all();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ScalingAction::ScaleUp);
        assert_eq!(events[0].reason, "low healthy nodes");
        assert_eq!(events[0].node_id, "node3");
    }

    #[tokio::test]
    async fn rejected_registration_leaves_ledger_untouched() {
        let cluster = Arc::new(FakeCluster::with_nodes(&[("node1", 0)]));
        cluster.reject_adds();
        let provisioner = Arc::new(RecordingProvisioner::default());
        let ledger = Arc::new(Mutex::new(ScalingLedger::new()));

        let err = executor(&cluster, &provisioner, &ledger)
            .execute("low healthy nodes", 1)
            .await
            .unwrap_err();

        assert!(matches!(err, ScaleError::RegistrationRejected { .. }));
        let ledger = ledger.lock().await;
        assert_eq!(ledger.cooldown().last_scale_up, 0);
        assert!(ledger.history().is_empty());
    }

    #[tokio::test]
    async fn provisioning_failure_skips_registration() {
        let cluster = Arc::new(FakeCluster::with_nodes(&[("node1", 0)]));
        let provisioner = Arc::new(RecordingProvisioner::failing());
        let ledger = Arc::new(Mutex::new(ScalingLedger::new()));

        let err = executor(&cluster, &provisioner, &ledger)
            .execute("low healthy nodes", 1)
            .await
            .unwrap_err();

        assert!(matches!(err, ScaleError::Provision { .. }));
        assert!(cluster.journal().is_empty());
        assert!(ledger.lock().await.history().is_empty());
    }

    #[tokio::test]
    async fn hung_registration_times_out() {
        let cluster = Arc::new(FakeCluster::with_nodes(&[("node1", 0)]));
        cluster.hang_adds();
        let provisioner = Arc::new(RecordingProvisioner::default());
        let ledger = Arc::new(Mutex::new(ScalingLedger::new()));

        let err = executor(&cluster, &provisioner, &ledger)
            .execute("low healthy nodes", 1)
            .await
            .unwrap_err();

        assert!(matches!(err, ScaleError::Timeout { op: "add_node", .. }));
        assert_eq!(ledger.lock().await.cooldown().last_scale_up, 0);
    }
}
