//! Cooldown timestamps and scaling history.
//!
//! Both live in one `ScalingLedger` so that a completed action bumps its
//! cooldown and appends its event in a single critical section.

use std::collections::VecDeque;

use serde::Serialize;

use vecscale_core::{ScalingAction, ScalingEvent, Timestamp};

/// Number of events exposed through the status API.
pub const HISTORY_WINDOW: usize = 10;

/// Events retained in memory for audit.
pub const DEFAULT_RETENTION: usize = 1000;

/// Completion time of the last successful action in each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CooldownState {
    pub last_scale_up: Timestamp,
    pub last_scale_down: Timestamp,
}

/// Append-only record of scaling events, oldest first.
#[derive(Debug, Clone)]
pub struct ScalingHistory {
    events: VecDeque<ScalingEvent>,
    retention: usize,
    total: u64,
}

impl ScalingHistory {
    pub fn new(retention: usize) -> Self {
        Self {
            events: VecDeque::new(),
            retention: retention.max(HISTORY_WINDOW),
            total: 0,
        }
    }

    pub fn push(&mut self, event: ScalingEvent) {
        if self.events.len() == self.retention {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.total += 1;
    }

    /// The most recent `n` events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ScalingEvent> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).cloned().collect()
    }

    /// Every retained event, oldest first.
    pub fn all(&self) -> Vec<ScalingEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events recorded since startup, including any no longer retained.
    pub fn total_recorded(&self) -> u64 {
        self.total
    }
}

/// Cooldown state plus history, mutated only on successful actions.
#[derive(Debug, Clone)]
pub struct ScalingLedger {
    cooldown: CooldownState,
    history: ScalingHistory,
}

impl Default for ScalingLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalingLedger {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            cooldown: CooldownState::default(),
            history: ScalingHistory::new(retention),
        }
    }

    pub fn cooldown(&self) -> CooldownState {
        self.cooldown
    }

    pub fn history(&self) -> &ScalingHistory {
        &self.history
    }

    /// Record a completed action: bump its cooldown, then append.
    pub fn record(&mut self, event: ScalingEvent) {
        let last = match event.action {
            ScalingAction::ScaleUp => &mut self.cooldown.last_scale_up,
            ScalingAction::ScaleDown => &mut self.cooldown.last_scale_down,
        };
        *last = (*last).max(event.timestamp);
        self.history.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(timestamp: Timestamp, action: ScalingAction, node: &str) -> ScalingEvent {
        ScalingEvent {
            timestamp,
            action,
            reason: "test".to_string(),
            node_id: node.to_string(),
        }
    }

    #[test]
    fn record_updates_matching_cooldown_only() {
        let mut ledger = ScalingLedger::new();
        ledger.record(event(1_000, ScalingAction::ScaleUp, "node4"));

        assert_eq!(ledger.cooldown().last_scale_up, 1_000);
        assert_eq!(ledger.cooldown().last_scale_down, 0);
        assert_eq!(ledger.history().len(), 1);

        ledger.record(event(2_000, ScalingAction::ScaleDown, "node4"));
        assert_eq!(ledger.cooldown().last_scale_up, 1_000);
        assert_eq!(ledger.cooldown().last_scale_down, 2_000);
    }

    #[test]
    fn cooldown_never_moves_backwards() {
        let mut ledger = ScalingLedger::new();
        ledger.record(event(5_000, ScalingAction::ScaleUp, "node2"));
        ledger.record(event(4_000, ScalingAction::ScaleUp, "node3"));

        assert_eq!(ledger.cooldown().last_scale_up, 5_000);
        assert_eq!(ledger.history().len(), 2);
    }

    #[test]
    fn recent_returns_last_window() {
        let mut history = ScalingHistory::new(DEFAULT_RETENTION);
        for i in 0..15 {
            history.push(event(i, ScalingAction::ScaleUp, &format!("node{i}")));
        }

        let recent = history.recent(HISTORY_WINDOW);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].node_id, "node5");
        assert_eq!(recent[9].node_id, "node14");
        assert_eq!(history.total_recorded(), 15);
        assert_eq!(history.all().len(), 15);
    }

    #[test]
    fn retention_evicts_oldest_but_keeps_total() {
        let mut history = ScalingHistory::new(HISTORY_WINDOW);
        for i in 0..25 {
            history.push(event(i, ScalingAction::ScaleDown, &format!("node{i}")));
        }

        assert_eq!(history.len(), HISTORY_WINDOW);
        assert_eq!(history.total_recorded(), 25);
        assert_eq!(history.all()[0].node_id, "node15");
    }

    #[test]
    fn retention_is_at_least_the_window() {
        let mut history = ScalingHistory::new(2);
        for i in 0..12 {
            history.push(event(i, ScalingAction::ScaleUp, "node2"));
        }
        assert_eq!(history.recent(HISTORY_WINDOW).len(), HISTORY_WINDOW);
    }
}
