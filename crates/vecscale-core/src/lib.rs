//! vecscale-core — shared types, configuration, and collaborator contracts.
//!
//! Everything the autoscaler needs to talk about a vector-storage cluster
//! without depending on how that cluster is implemented:
//!
//! - **`types`** — node identity, cluster status snapshots, scaling events
//! - **`config`** — `ThresholdConfig` and the daemon's TOML config file
//! - **`contract`** — `StorageManager` and `Provisioner` traits consumed by
//!   the autoscaler and implemented by `vecscale-cluster`

pub mod config;
pub mod contract;
pub mod error;
pub mod types;

pub use config::{
    ClusterConfig, DaemonConfig, ThresholdConfig, VecscaleConfig, Watermarks, parse_duration,
};
pub use contract::{BoxFuture, Provisioner, StorageManager};
pub use error::{CoreError, CoreResult};
pub use types::*;
