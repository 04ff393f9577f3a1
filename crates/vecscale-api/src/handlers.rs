//! REST API handlers.
//!
//! Autoscaling handlers go through `AutoScaler`; cluster handlers read and
//! write the `LocalCluster` membership table directly.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::warn;

use vecscale_autoscale::ScaleError;
use vecscale_cluster::Member;
use vecscale_core::*;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        })
    }

    fn ok_with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            message: Some(message.into()),
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
            message: None,
        }),
    )
}

fn scale_error_status(e: &ScaleError) -> StatusCode {
    match e {
        e if e.is_abstention() => StatusCode::CONFLICT,
        ScaleError::PortExhausted { .. } => StatusCode::CONFLICT,
        ScaleError::Config(_) => StatusCode::BAD_REQUEST,
        ScaleError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

#[derive(serde::Serialize)]
struct NodeResult {
    node_id: NodeId,
}

#[derive(serde::Serialize)]
struct RunningState {
    is_running: bool,
}

// ── Health ─────────────────────────────────────────────────────

/// GET /health
pub async fn health() -> impl IntoResponse {
    ApiResponse::ok(serde_json::json!({ "status": "ok" }))
}

// ── Autoscaling ────────────────────────────────────────────────

/// GET /autoscaling/status
pub async fn autoscaling_status(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.scaler.status().await)
}

/// POST /autoscaling/start
pub async fn start_autoscaling(State(state): State<ApiState>) -> impl IntoResponse {
    let message = if state.scaler.start().await {
        "auto-scaling started"
    } else {
        "auto-scaling already running"
    };
    ApiResponse::ok_with_message(RunningState { is_running: true }, message)
}

/// POST /autoscaling/stop
pub async fn stop_autoscaling(State(state): State<ApiState>) -> impl IntoResponse {
    let message = if state.scaler.stop().await {
        "auto-scaling stopped"
    } else {
        "auto-scaling was not running"
    };
    ApiResponse::ok_with_message(RunningState { is_running: false }, message)
}

/// POST /autoscaling/thresholds
///
/// The body replaces the thresholds wholesale; omitted fields take their
/// defaults, not their current values.
pub async fn update_thresholds(
    State(state): State<ApiState>,
    Json(thresholds): Json<ThresholdConfig>,
) -> impl IntoResponse {
    match state.scaler.update_thresholds(thresholds).await {
        Ok(()) => {
            let current = ThresholdConfig::clone(&*state.scaler.thresholds().await);
            ApiResponse::ok_with_message(current, "thresholds updated").into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response(),
    }
}

/// POST /autoscaling/scale-up
pub async fn manual_scale_up(State(state): State<ApiState>) -> impl IntoResponse {
    match state.scaler.manual_scale_up().await {
        Ok(node_id) => {
            let message = format!("added {node_id}");
            ApiResponse::ok_with_message(NodeResult { node_id }, message).into_response()
        }
        Err(e) => {
            warn!(error = %e, "manual scale up failed");
            error_response(&e.to_string(), scale_error_status(&e)).into_response()
        }
    }
}

/// POST /autoscaling/scale-down
pub async fn manual_scale_down(State(state): State<ApiState>) -> impl IntoResponse {
    match state.scaler.manual_scale_down().await {
        Ok(node_id) => {
            let message = format!("removed {node_id}");
            ApiResponse::ok_with_message(NodeResult { node_id }, message).into_response()
        }
        Err(e) => {
            warn!(error = %e, "manual scale down failed");
            error_response(&e.to_string(), scale_error_status(&e)).into_response()
        }
    }
}

// ── Cluster ────────────────────────────────────────────────────

#[derive(serde::Serialize)]
struct ClusterView {
    #[serde(flatten)]
    status: ClusterStatus,
    members: Vec<Member>,
    migration_enabled: bool,
}

/// GET /cluster/status
pub async fn cluster_status(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(ClusterView {
        status: state.cluster.status(),
        members: state.cluster.list_members(),
        migration_enabled: state.scaler.migration_enabled(),
    })
}

/// Heartbeat request body. Both fields are optional.
#[derive(Debug, Default, serde::Deserialize)]
pub struct HeartbeatRequest {
    pub vector_count: Option<u64>,
    pub load: Option<f64>,
}

/// POST /cluster/nodes/:id/heartbeat
pub async fn node_heartbeat(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<HeartbeatRequest>,
) -> impl IntoResponse {
    if !state.cluster.heartbeat(&id, req.vector_count, req.load) {
        return error_response("node not found", StatusCode::NOT_FOUND).into_response();
    }
    match state.cluster.get_member(&id) {
        Some(member) => ApiResponse::ok(member).into_response(),
        None => error_response("node not found", StatusCode::NOT_FOUND).into_response(),
    }
}
