//! AutoScaler — the monitoring loop and operator entry points.
//!
//! Each cycle pulls a cluster status snapshot, asks the decision engine
//! what to do, and dispatches to the matching executor. Manual triggers
//! bypass the decision engine and cooldowns but share the same operation
//! lock, so at most one scale operation is in flight at a time.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use vecscale_core::*;

use crate::collab;
use crate::decision::{self, Action};
use crate::error::ScaleResult;
use crate::ledger::{ScalingLedger, DEFAULT_RETENTION, HISTORY_WINDOW};
use crate::scale_down::ScaleDownExecutor;
use crate::scale_up::ScaleUpExecutor;

const MANUAL_SCALE_UP: &str = "manual scale up";
const MANUAL_SCALE_DOWN: &str = "manual scale down";

/// Executor and loop settings that do not change at runtime.
#[derive(Debug, Clone)]
pub struct ScalerOptions {
    /// Host new workers listen on.
    pub worker_host: String,
    /// New worker `N` listens on `base_port + N`.
    pub base_port: u16,
    /// Upper bound on each storage-manager call.
    pub call_timeout: Duration,
    /// Pause after a failed cycle, instead of the health-check interval.
    pub error_backoff: Duration,
    /// Node that is never removed.
    pub seed_node: NodeId,
    /// Events kept in memory for audit.
    pub history_retention: usize,
}

impl Default for ScalerOptions {
    fn default() -> Self {
        Self::from(&DaemonConfig::default())
    }
}

impl From<&DaemonConfig> for ScalerOptions {
    fn from(config: &DaemonConfig) -> Self {
        Self {
            worker_host: config.worker_host.clone(),
            base_port: config.base_port,
            call_timeout: config.call_timeout,
            error_backoff: config.error_backoff,
            seed_node: SEED_NODE_ID.to_string(),
            history_retention: DEFAULT_RETENTION,
        }
    }
}

/// Result of one monitoring cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Maintained,
    ScaledUp(NodeId),
    ScaledDown(NodeId),
    /// Scale-down was decided but the fresh status left nothing to remove.
    Abstained,
}

/// Operator-facing view of the autoscaler.
#[derive(Debug, Clone, Serialize)]
pub struct ScalingStatus {
    pub is_running: bool,
    pub last_scale_up: Timestamp,
    pub last_scale_down: Timestamp,
    /// The most recent events, oldest first.
    pub scaling_history: Vec<ScalingEvent>,
    pub total_events: u64,
    pub thresholds: ThresholdConfig,
}

/// Handle to the running monitoring task.
struct MonitorSlot {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Keeps cluster size within the configured bounds.
pub struct AutoScaler {
    cluster: Arc<dyn StorageManager>,
    provisioner: Arc<dyn Provisioner>,
    thresholds: RwLock<Arc<ThresholdConfig>>,
    ledger: Arc<Mutex<ScalingLedger>>,
    scale_up: ScaleUpExecutor,
    scale_down: ScaleDownExecutor,
    options: ScalerOptions,
    /// Held for the whole of decide → execute, by the loop and by manual
    /// triggers alike.
    op_lock: Mutex<()>,
    monitor: Mutex<Option<MonitorSlot>>,
}

impl AutoScaler {
    /// Create a stopped autoscaler with default options.
    pub fn new(
        cluster: Arc<dyn StorageManager>,
        provisioner: Arc<dyn Provisioner>,
        thresholds: ThresholdConfig,
    ) -> ScaleResult<Self> {
        thresholds.validate()?;
        Ok(Self::build(
            cluster,
            provisioner,
            thresholds,
            ScalerOptions::default(),
        ))
    }

    /// Replace the executor and loop settings.
    pub fn with_options(self, options: ScalerOptions) -> Self {
        let thresholds = Arc::unwrap_or_clone(self.thresholds.into_inner());
        Self::build(self.cluster, self.provisioner, thresholds, options)
    }

    fn build(
        cluster: Arc<dyn StorageManager>,
        provisioner: Arc<dyn Provisioner>,
        thresholds: ThresholdConfig,
        options: ScalerOptions,
    ) -> Self {
        let ledger = Arc::new(Mutex::new(ScalingLedger::with_retention(
            options.history_retention,
        )));
        let scale_up = ScaleUpExecutor::new(
            cluster.clone(),
            provisioner.clone(),
            ledger.clone(),
            options.worker_host.clone(),
            options.base_port,
            options.call_timeout,
        );
        let scale_down = ScaleDownExecutor::new(
            cluster.clone(),
            ledger.clone(),
            options.seed_node.clone(),
            options.call_timeout,
        );

        Self {
            cluster,
            provisioner,
            thresholds: RwLock::new(Arc::new(thresholds)),
            ledger,
            scale_up,
            scale_down,
            options,
            op_lock: Mutex::new(()),
            monitor: Mutex::new(None),
        }
    }

    /// Whether scale-down migrates data before removing a node.
    pub fn migration_enabled(&self) -> bool {
        self.scale_down.migration_enabled()
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Start the monitoring loop. Returns `false` if it was already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut monitor = self.monitor.lock().await;
        if monitor.is_some() {
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(self).monitor_loop(shutdown_rx));
        *monitor = Some(MonitorSlot {
            shutdown_tx,
            handle,
        });

        info!("auto-scaler monitoring started");
        true
    }

    /// Stop the monitoring loop after its current cycle. Returns `false`
    /// if it was not running.
    ///
    /// Does not wait: an in-flight cycle keeps running in the background.
    /// Use [`shutdown`](Self::shutdown) when the process is about to exit.
    pub async fn stop(&self) -> bool {
        let Some(slot) = self.monitor.lock().await.take() else {
            return false;
        };
        let _ = slot.shutdown_tx.send(true);
        info!("auto-scaler monitoring stopped");
        true
    }

    /// Stop the monitoring loop and wait until no scale operation is in
    /// flight, automatic or manual.
    pub async fn shutdown(&self) {
        let slot = self.monitor.lock().await.take();
        if let Some(slot) = slot {
            let _ = slot.shutdown_tx.send(true);
            if let Err(e) = slot.handle.await {
                error!(error = %e, "monitoring task ended abnormally");
            }
            info!("auto-scaler monitoring stopped");
        }

        // Manual operations hold the lock for their whole run.
        drop(self.op_lock.lock().await);
        debug!("no scale operation in flight");
    }

    pub async fn is_running(&self) -> bool {
        self.monitor.lock().await.is_some()
    }

    async fn monitor_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        debug!("monitoring loop starting");

        loop {
            // Each cycle runs in its own task so a panicking collaborator
            // fails the cycle instead of the loop.
            let cycle = tokio::spawn({
                let scaler = Arc::clone(&self);
                async move { scaler.run_cycle().await }
            });

            let pause = match cycle.await {
                Ok(Ok(outcome)) => {
                    debug!(?outcome, "monitoring cycle complete");
                    self.thresholds.read().await.health_check_interval
                }
                Ok(Err(e)) => {
                    error!(error = %e, backoff = ?self.options.error_backoff, "monitoring cycle failed");
                    self.options.error_backoff
                }
                Err(e) => {
                    error!(
                        error = %e,
                        panicked = e.is_panic(),
                        backoff = ?self.options.error_backoff,
                        "monitoring cycle aborted"
                    );
                    self.options.error_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = shutdown.changed() => {
                    debug!("monitoring loop shutting down");
                    break;
                }
            }
        }
    }

    // ── Cycle ──────────────────────────────────────────────────────

    /// Run one decide → execute pass.
    ///
    /// Policy abstentions come back as `Ok(CycleOutcome::Abstained)`;
    /// collaborator failures come back as errors and leave the cooldowns
    /// and history untouched.
    pub async fn run_cycle(&self) -> ScaleResult<CycleOutcome> {
        let _op = self.op_lock.lock().await;

        let thresholds = self.thresholds().await;
        let status = self.fetch_status().await?;
        let cooldown = self.ledger.lock().await.cooldown();
        let decision = decision::decide(&status, &thresholds, &cooldown, epoch_millis());

        debug!(
            action = ?decision.action,
            reason = decision.reason,
            total_nodes = decision.context.total_nodes,
            healthy_nodes = decision.context.healthy_nodes,
            "scaling decision"
        );

        match decision.action {
            Action::Maintain => Ok(CycleOutcome::Maintained),
            Action::ScaleUp => self
                .scale_up
                .execute(decision.reason, status.total_nodes)
                .await
                .map(CycleOutcome::ScaledUp),
            Action::ScaleDown => match self
                .scale_down
                .execute(decision.reason, status.total_nodes, thresholds.min_nodes)
                .await
            {
                Ok(node_id) => Ok(CycleOutcome::ScaledDown(node_id)),
                Err(e) if e.is_abstention() => Ok(CycleOutcome::Abstained),
                Err(e) => Err(e),
            },
        }
    }

    // ── Operator entry points ──────────────────────────────────────

    /// Add a node now, ignoring the decision engine and cooldowns.
    pub async fn manual_scale_up(&self) -> ScaleResult<NodeId> {
        let _op = self.op_lock.lock().await;
        let status = self.fetch_status().await?;
        info!(total_nodes = status.total_nodes, "manual scale up requested");
        self.scale_up.execute(MANUAL_SCALE_UP, status.total_nodes).await
    }

    /// Remove a node now, ignoring the decision engine and cooldowns.
    /// The seed node and the `min_nodes` floor are still respected.
    pub async fn manual_scale_down(&self) -> ScaleResult<NodeId> {
        let _op = self.op_lock.lock().await;
        let min_nodes = self.thresholds().await.min_nodes;
        let status = self.fetch_status().await?;
        info!(total_nodes = status.total_nodes, "manual scale down requested");
        self.scale_down
            .execute(MANUAL_SCALE_DOWN, status.total_nodes, min_nodes)
            .await
    }

    /// Replace the thresholds wholesale. Takes effect on the next cycle.
    pub async fn update_thresholds(&self, thresholds: ThresholdConfig) -> ScaleResult<()> {
        thresholds.validate()?;
        *self.thresholds.write().await = Arc::new(thresholds);
        info!("auto-scaling thresholds updated");
        Ok(())
    }

    pub async fn thresholds(&self) -> Arc<ThresholdConfig> {
        self.thresholds.read().await.clone()
    }

    /// Status for operators: running flag, cooldowns, last events, config.
    pub async fn status(&self) -> ScalingStatus {
        let is_running = self.is_running().await;
        let thresholds = ThresholdConfig::clone(&*self.thresholds().await);
        let ledger = self.ledger.lock().await;
        let cooldown = ledger.cooldown();

        ScalingStatus {
            is_running,
            last_scale_up: cooldown.last_scale_up,
            last_scale_down: cooldown.last_scale_down,
            scaling_history: ledger.history().recent(HISTORY_WINDOW),
            total_events: ledger.history().total_recorded(),
            thresholds,
        }
    }

    /// Every retained scaling event, oldest first.
    pub async fn history(&self) -> Vec<ScalingEvent> {
        self.ledger.lock().await.history().all()
    }

    async fn fetch_status(&self) -> ScaleResult<ClusterStatus> {
        collab::call(
            "get_cluster_status",
            self.options.call_timeout,
            self.cluster.get_cluster_status(),
        )
        .await
        .inspect_err(|e| error!(error = %e, "failed to fetch cluster status"))
    }
}

impl std::fmt::Debug for AutoScaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoScaler")
            .field("options", &self.options)
            .field("migration", &self.migration_enabled())
            .finish_non_exhaustive()
    }
}
