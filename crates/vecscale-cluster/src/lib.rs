//! vecscale-cluster — in-process storage manager for vecscale.
//!
//! Implements the `StorageManager` contract over an in-memory membership
//! table, and the `Provisioner` contract by spawning worker processes.
//!
//! # Architecture
//!
//! ```text
//! LocalCluster (StorageManager)
//!   ├── Membership (ordered, seed node first)
//!   │   ├── join() / leave()
//!   │   ├── heartbeat() → vector count, load, last-seen
//!   │   └── dead-timeout health detection
//!   └── Shard placement
//!       ├── migrate_from() → moves a node's vectors to the least-loaded peers
//!       └── rebalance() → evens vector counts across members
//!
//! ProcessProvisioner (Provisioner)
//!   └── spawns `<worker_command> --node-id <id> --host <host> --port <port>`
//! ```

pub mod membership;
pub mod provision;

pub use membership::{LocalCluster, Member};
pub use provision::{NoopProvisioner, ProcessProvisioner};
