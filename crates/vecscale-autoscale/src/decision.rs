//! Scaling decision engine.
//!
//! A pure function of the cluster snapshot, thresholds, cooldown state and
//! the current time. Rules are evaluated in priority order and the first
//! match wins:
//!
//! ```text
//! healthy < min_nodes && total < max_nodes && since_up   > up_cooldown   => ScaleUp
//! total > min_nodes                       && since_down > down_cooldown => ScaleDown
//! otherwise                                                              => Maintain
//! ```
//!
//! All comparisons are strict. Resource watermarks in `ThresholdConfig` do
//! not take part.

use std::time::Duration;

use serde::Serialize;

use vecscale_core::{ClusterStatus, ThresholdConfig, Timestamp};

use crate::ledger::CooldownState;

pub const REASON_LOW_HEALTHY: &str = "low healthy nodes";
pub const REASON_EXCESS_CAPACITY: &str = "excess capacity";
pub const REASON_WITHIN_BOUNDS: &str = "within bounds";
pub const REASON_INCONSISTENT: &str = "inconsistent cluster status";

/// What the engine wants done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ScaleUp,
    ScaleDown,
    Maintain,
}

/// Inputs the decision was made on, for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionContext {
    pub total_nodes: u32,
    pub healthy_nodes: u32,
    pub min_nodes: u32,
    pub max_nodes: u32,
    pub since_scale_up: Duration,
    pub since_scale_down: Duration,
}

/// A scaling decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaleDecision {
    pub action: Action,
    pub reason: &'static str,
    pub context: DecisionContext,
}

/// Evaluate one snapshot.
pub fn decide(
    status: &ClusterStatus,
    thresholds: &ThresholdConfig,
    cooldown: &CooldownState,
    now: Timestamp,
) -> ScaleDecision {
    let context = DecisionContext {
        total_nodes: status.total_nodes,
        healthy_nodes: status.healthy_nodes,
        min_nodes: thresholds.min_nodes,
        max_nodes: thresholds.max_nodes,
        since_scale_up: elapsed(cooldown.last_scale_up, now),
        since_scale_down: elapsed(cooldown.last_scale_down, now),
    };

    let (action, reason) = if !status.is_consistent() {
        // Missing or contradictory data: never act on it.
        (Action::Maintain, REASON_INCONSISTENT)
    } else if context.healthy_nodes < context.min_nodes
        && context.total_nodes < context.max_nodes
        && context.since_scale_up > thresholds.scale_up_cooldown
    {
        (Action::ScaleUp, REASON_LOW_HEALTHY)
    } else if context.total_nodes > context.min_nodes
        && context.since_scale_down > thresholds.scale_down_cooldown
    {
        (Action::ScaleDown, REASON_EXCESS_CAPACITY)
    } else {
        (Action::Maintain, REASON_WITHIN_BOUNDS)
    };

    ScaleDecision {
        action,
        reason,
        context,
    }
}

fn elapsed(since: Timestamp, now: Timestamp) -> Duration {
    Duration::from_millis(now.saturating_sub(since))
}
