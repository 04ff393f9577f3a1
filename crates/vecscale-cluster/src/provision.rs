//! Worker provisioning.
//!
//! `ProcessProvisioner` starts a worker for a new node by spawning the
//! configured command in the background. It does not wait for the worker
//! to come up; the worker announces itself through heartbeats.

use std::process::Stdio;

use anyhow::Context;
use tracing::{debug, info, warn};

use vecscale_core::{Provisioner, VectorNode};

/// Spawns `<program> [args..] --node-id <id> --host <host> --port <port>`.
///
/// Must be called from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct ProcessProvisioner {
    program: String,
    args: Vec<String>,
}

impl ProcessProvisioner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a command line where the first element is the program.
    /// Returns `None` for an empty command.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    /// Full argument list passed to the worker for `node`.
    pub fn worker_args(&self, node: &VectorNode) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend([
            "--node-id".to_string(),
            node.id.clone(),
            "--host".to_string(),
            node.host.clone(),
            "--port".to_string(),
            node.port.to_string(),
        ]);
        args
    }
}

impl Provisioner for ProcessProvisioner {
    fn provision(&self, node: &VectorNode) -> anyhow::Result<()> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(self.worker_args(node))
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn worker `{}` for {}", self.program, node.id))?;

        info!(
            node_id = %node.id,
            address = %node.address(),
            pid = ?child.id(),
            "worker process spawned"
        );

        // Reap the child so it does not linger as a zombie once it exits.
        let node_id = node.id.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!(%node_id, "worker process exited"),
                Ok(status) => warn!(%node_id, %status, "worker process exited with failure"),
                Err(e) => warn!(%node_id, error = %e, "failed to wait on worker process"),
            }
        });

        Ok(())
    }
}

/// Provisioner for clusters whose workers are started externally.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvisioner;

impl Provisioner for NoopProvisioner {
    fn provision(&self, node: &VectorNode) -> anyhow::Result<()> {
        debug!(node_id = %node.id, "provisioning skipped: workers are managed externally");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_args_append_node_identity() {
        let provisioner = ProcessProvisioner::from_command(&[
            "vector-node".to_string(),
            "--data-dir".to_string(),
            "/tmp/v".to_string(),
        ])
        .unwrap();

        let args = provisioner.worker_args(&VectorNode::new("node4", "localhost", 8004));
        assert_eq!(
            args,
            vec![
                "--data-dir", "/tmp/v", "--node-id", "node4", "--host", "localhost", "--port",
                "8004"
            ]
        );
    }

    #[test]
    fn empty_command_has_no_provisioner() {
        assert!(ProcessProvisioner::from_command(&[]).is_none());
    }

    #[tokio::test]
    async fn spawn_missing_program_fails() {
        let provisioner = ProcessProvisioner::new("/nonexistent/vecscale-worker", Vec::new());
        let err = provisioner
            .provision(&VectorNode::new("node2", "localhost", 8002))
            .unwrap_err();
        assert!(err.to_string().contains("node2"));
    }

    #[tokio::test]
    async fn spawn_does_not_wait_for_worker() {
        // `sh -c` takes the trailing worker flags as positional parameters.
        let provisioner = ProcessProvisioner::new("sh", vec!["-c".to_string(), "exit 0".to_string()]);
        provisioner
            .provision(&VectorNode::new("node2", "localhost", 8002))
            .unwrap();
    }

    #[test]
    fn noop_provisioner_succeeds() {
        NoopProvisioner
            .provision(&VectorNode::new("node2", "localhost", 8002))
            .unwrap();
    }
}
