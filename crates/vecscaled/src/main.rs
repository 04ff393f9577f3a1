//! vecscaled — the vecscale daemon.
//!
//! Single binary that assembles the autoscaling stack:
//! - In-process cluster membership (seed nodes bootstrapped at startup)
//! - Worker provisioner (spawned processes, or none)
//! - AutoScaler monitoring loop
//! - REST API
//!
//! # Usage
//!
//! ```text
//! vecscaled standalone --config /etc/vecscale/vecscale.toml --port 8000
//! vecscaled check-config --config /etc/vecscale/vecscale.toml
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vecscale_api::{ApiState, build_router};
use vecscale_autoscale::{AutoScaler, ScalerOptions};
use vecscale_cluster::{LocalCluster, NoopProvisioner, ProcessProvisioner};
use vecscale_core::{Provisioner, VecscaleConfig};

#[derive(Parser)]
#[command(name = "vecscaled", about = "vecscale autoscaling daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the cluster, autoscaler and API in one process.
    Standalone {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on, overriding `daemon.listen_port`.
        #[arg(long)]
        port: Option<u16>,

        /// Start monitoring immediately, overriding `daemon.autostart`.
        #[arg(long)]
        autostart: bool,
    },

    /// Validate a config file and print the effective configuration.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vecscaled=debug,vecscale=debug"));
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Command::Standalone {
            config,
            port,
            autostart,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(port) = port {
                config.daemon.listen_port = port;
            }
            config.daemon.autostart |= autostart;
            run_standalone(config).await
        }
        Command::CheckConfig { config } => {
            let config = load_config(Some(&config))?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<VecscaleConfig> {
    match path {
        Some(path) => {
            let config = VecscaleConfig::from_file(path)?;
            info!(path = %path.display(), "config loaded");
            Ok(config)
        }
        None => {
            info!("no config file given, using defaults");
            Ok(VecscaleConfig::default())
        }
    }
}

async fn run_standalone(config: VecscaleConfig) -> anyhow::Result<()> {
    info!("vecscale daemon starting in standalone mode");

    // ── Initialize subsystems ──────────────────────────────────

    let mut cluster = LocalCluster::new();
    if let Some(timeout) = config.cluster.dead_timeout {
        cluster = cluster.with_dead_timeout(timeout);
    }
    let seeded = cluster.bootstrap(
        config.cluster.seed_nodes,
        &config.daemon.worker_host,
        config.daemon.base_port,
    );
    info!(nodes = ?seeded, "cluster bootstrapped");

    let provisioner: Arc<dyn Provisioner> =
        match ProcessProvisioner::from_command(&config.daemon.worker_command) {
            Some(p) => {
                info!(command = ?config.daemon.worker_command, "process provisioner configured");
                Arc::new(p)
            }
            None => {
                warn!("no worker_command configured; new nodes must be started externally");
                Arc::new(NoopProvisioner)
            }
        };

    let scaler = Arc::new(
        AutoScaler::new(
            Arc::new(cluster.clone()),
            provisioner,
            config.thresholds.clone(),
        )?
        .with_options(ScalerOptions::from(&config.daemon)),
    );
    info!(
        min_nodes = config.thresholds.min_nodes,
        max_nodes = config.thresholds.max_nodes,
        interval = ?config.thresholds.health_check_interval,
        migration = scaler.migration_enabled(),
        "autoscaler initialized"
    );

    if config.daemon.autostart {
        scaler.start().await;
    }

    // ── Start API server ───────────────────────────────────────

    let router = build_router(ApiState {
        scaler: scaler.clone(),
        cluster,
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.daemon.listen_port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    // Let any in-flight scale operation finish before the runtime goes away.
    scaler.shutdown().await;

    info!("vecscale daemon stopped");
    Ok(())
}
