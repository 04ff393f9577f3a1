//! vecscale-api — operator REST API for vecscale.
//!
//! Provides axum route handlers for driving the autoscaler and inspecting
//! the in-process cluster.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/health` | Liveness probe |
//! | GET | `/autoscaling/status` | Running flag, cooldowns, recent events, thresholds |
//! | POST | `/autoscaling/start` | Start the monitoring loop |
//! | POST | `/autoscaling/stop` | Stop the monitoring loop |
//! | POST | `/autoscaling/thresholds` | Replace the thresholds |
//! | POST | `/autoscaling/scale-up` | Add a node now |
//! | POST | `/autoscaling/scale-down` | Remove a node now |
//! | GET | `/cluster/status` | Membership and node health |
//! | POST | `/cluster/nodes/{id}/heartbeat` | Report node liveness and load |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use vecscale_autoscale::AutoScaler;
use vecscale_cluster::LocalCluster;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub scaler: Arc<AutoScaler>,
    pub cluster: LocalCluster,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let autoscaling = Router::new()
        .route("/status", get(handlers::autoscaling_status))
        .route("/start", post(handlers::start_autoscaling))
        .route("/stop", post(handlers::stop_autoscaling))
        .route("/thresholds", post(handlers::update_thresholds))
        .route("/scale-up", post(handlers::manual_scale_up))
        .route("/scale-down", post(handlers::manual_scale_down));

    let cluster = Router::new()
        .route("/status", get(handlers::cluster_status))
        .route("/nodes/{id}/heartbeat", post(handlers::node_heartbeat));

    Router::new()
        .nest("/autoscaling", autoscaling)
        .nest("/cluster", cluster)
        .route("/health", get(handlers::health))
        .with_state(state)
}
