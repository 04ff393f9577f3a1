//! vecscale-autoscale — node-count scaling for a vector-storage cluster.
//!
//! Polls the storage manager for a `ClusterStatus`, decides whether to add
//! or remove a node, and carries the decision out. Cooldown windows
//! (`scale_up_cooldown`, `scale_down_cooldown`) prevent rapid oscillation.
//!
//! # Scaling Algorithm
//!
//! ```text
//! if healthy < min_nodes and total < max_nodes and up cooldown elapsed:
//!     provision node<total+1>, then add_node
//!
//! elif total > min_nodes and down cooldown elapsed:
//!     pick the non-seed node with the fewest vectors
//!     migrate its shards (when supported), remove_node, rebalance_shards
//!
//! else:
//!     maintain
//! ```
//!
//! Every decide → execute pass, automatic or manual, runs under a single
//! operation lock.

mod collab;
pub mod decision;
pub mod error;
pub mod ledger;
pub mod scale_down;
pub mod scale_up;
pub mod scaler;

#[cfg(test)]
mod testing;

pub use decision::{decide, Action, DecisionContext, ScaleDecision};
pub use error::{ScaleError, ScaleResult};
pub use ledger::{CooldownState, ScalingHistory, ScalingLedger, HISTORY_WINDOW};
pub use scale_down::{select_removal_candidate, ScaleDownExecutor};
pub use scale_up::{next_node, ScaleUpExecutor};
pub use scaler::{AutoScaler, CycleOutcome, ScalerOptions, ScalingStatus};
