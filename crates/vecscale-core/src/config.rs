//! vecscale.toml configuration parser.
//!
//! ```toml
//! [thresholds]
//! min_nodes = 3
//! max_nodes = 10
//! scale_up_cooldown = "5m"
//! scale_down_cooldown = "10m"
//! health_check_interval = "30s"
//! cpu = { high = 0.75, low = 0.30 }
//!
//! [daemon]
//! listen_port = 8000
//! worker_command = ["vector-node"]
//!
//! [cluster]
//! seed_nodes = 1
//! ```
//!
//! Durations are written as `"500ms"`, `"30s"`, `"5m"`, `"1h"` or a bare
//! integer number of seconds.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// High/low watermark pair for one resource dimension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Watermarks {
    pub high: f64,
    pub low: f64,
}

impl Watermarks {
    pub const fn new(high: f64, low: f64) -> Self {
        Self { high, low }
    }

    fn validate(&self, name: &str) -> CoreResult<()> {
        if !self.high.is_finite() || !self.low.is_finite() {
            return Err(CoreError::InvalidThresholds(format!(
                "{name} watermarks must be finite"
            )));
        }
        if self.low > self.high {
            return Err(CoreError::InvalidThresholds(format!(
                "{name} low watermark {} exceeds high watermark {}",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Scaling thresholds, node bounds, and timing.
///
/// Replaced wholesale at runtime. The resource watermarks are carried for
/// operators and API compatibility; the decision engine keys only on node
/// counts and cooldowns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    pub min_nodes: u32,
    pub max_nodes: u32,
    #[serde(with = "duration_str")]
    pub scale_up_cooldown: Duration,
    #[serde(with = "duration_str")]
    pub scale_down_cooldown: Duration,
    #[serde(with = "duration_str")]
    pub health_check_interval: Duration,
    /// CPU utilization (0.0 – 1.0).
    pub cpu: Watermarks,
    /// Memory utilization (0.0 – 1.0).
    pub memory: Watermarks,
    /// Storage utilization (0.0 – 1.0).
    pub storage: Watermarks,
    /// Query latency in milliseconds.
    pub latency_ms: Watermarks,
    /// Error rate (0.0 – 1.0).
    pub error_rate: Watermarks,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_nodes: 3,
            max_nodes: 10,
            scale_up_cooldown: Duration::from_secs(300),
            scale_down_cooldown: Duration::from_secs(600),
            health_check_interval: Duration::from_secs(30),
            cpu: Watermarks::new(0.75, 0.30),
            memory: Watermarks::new(0.80, 0.40),
            storage: Watermarks::new(0.85, 0.50),
            latency_ms: Watermarks::new(1000.0, 100.0),
            error_rate: Watermarks::new(0.05, 0.01),
        }
    }
}

impl ThresholdConfig {
    /// Reject configurations the decision engine cannot act on sensibly.
    pub fn validate(&self) -> CoreResult<()> {
        if self.min_nodes == 0 {
            return Err(CoreError::InvalidThresholds(
                "min_nodes must be greater than zero".to_string(),
            ));
        }
        if self.min_nodes > self.max_nodes {
            return Err(CoreError::InvalidThresholds(format!(
                "min_nodes ({}) exceeds max_nodes ({})",
                self.min_nodes, self.max_nodes
            )));
        }
        if self.health_check_interval.is_zero() {
            return Err(CoreError::InvalidThresholds(
                "health_check_interval must be greater than zero".to_string(),
            ));
        }

        self.cpu.validate("cpu")?;
        self.memory.validate("memory")?;
        self.storage.validate("storage")?;
        self.latency_ms.validate("latency_ms")?;
        self.error_rate.validate("error_rate")?;
        Ok(())
    }
}

/// Settings for the daemon process and the executors it drives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Port for the operator API.
    pub listen_port: u16,
    /// Host new workers listen on.
    pub worker_host: String,
    /// New worker `N` listens on `base_port + N`.
    pub base_port: u16,
    /// Program and leading arguments used to start a worker. The daemon
    /// appends `--node-id`, `--host` and `--port`. Empty disables
    /// provisioning (workers are managed externally).
    pub worker_command: Vec<String>,
    /// Upper bound on each storage-manager call.
    #[serde(with = "duration_str")]
    pub call_timeout: Duration,
    /// Pause after a failed monitoring cycle.
    #[serde(with = "duration_str")]
    pub error_backoff: Duration,
    /// Start the monitoring loop on boot.
    pub autostart: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_port: 8000,
            worker_host: "localhost".to_string(),
            base_port: 8000,
            worker_command: Vec::new(),
            call_timeout: Duration::from_secs(30),
            error_backoff: Duration::from_secs(10),
            autostart: false,
        }
    }
}

/// Settings for the in-process cluster manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusterConfig {
    /// Nodes registered at boot (`node1` .. `nodeN`).
    pub seed_nodes: u32,
    /// Mark a node unhealthy after this long without a heartbeat.
    /// Unset disables expiry.
    #[serde(with = "duration_str::option", skip_serializing_if = "Option::is_none")]
    pub dead_timeout: Option<Duration>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            seed_nodes: 1,
            dead_timeout: None,
        }
    }
}

/// Top-level vecscale.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VecscaleConfig {
    pub thresholds: ThresholdConfig,
    pub daemon: DaemonConfig,
    pub cluster: ClusterConfig,
}

impl VecscaleConfig {
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: VecscaleConfig =
            toml::from_str(content).map_err(|e| CoreError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.thresholds.validate()?;
        if self.daemon.call_timeout.is_zero() {
            return Err(CoreError::InvalidThresholds(
                "daemon.call_timeout must be greater than zero".to_string(),
            ));
        }
        if self.cluster.seed_nodes == 0 {
            return Err(CoreError::InvalidThresholds(
                "cluster.seed_nodes must be at least 1".to_string(),
            ));
        }
        if self.cluster.seed_nodes > self.thresholds.max_nodes {
            return Err(CoreError::InvalidThresholds(format!(
                "cluster.seed_nodes ({}) exceeds thresholds.max_nodes ({})",
                self.cluster.seed_nodes, self.thresholds.max_nodes
            )));
        }
        Ok(())
    }
}

/// Parse a duration string like "500ms", "30s", "5m", "1h" or "45".
pub fn parse_duration(s: &str) -> CoreResult<Duration> {
    let s = s.trim();
    let invalid = || CoreError::InvalidDuration(s.to_string());

    let (digits, unit_ms): (&str, u64) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1_000)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60_000)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3_600_000)
    } else {
        (s, 1_000)
    };

    let value = digits.trim().parse::<u64>().map_err(|_| invalid())?;
    let millis = value.checked_mul(unit_ms).ok_or_else(invalid)?;
    Ok(Duration::from_millis(millis))
}

fn format_duration(d: &Duration) -> String {
    let millis = d.as_millis();
    if millis % 1_000 == 0 {
        format!("{}s", millis / 1_000)
    } else {
        format!("{millis}ms")
    }
}

/// Serde adapter writing durations as human-readable strings.
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    impl Raw {
        fn into_duration<E: serde::de::Error>(self) -> Result<Duration, E> {
            match self {
                Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
                Raw::Text(text) => super::parse_duration(&text).map_err(E::custom),
            }
        }
    }

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Raw::deserialize(deserializer)?.into_duration()
    }

    pub mod option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer, Serializer};

        use super::Raw;

        pub fn serialize<S: Serializer>(
            d: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match d {
                Some(d) => serializer.serialize_some(&super::super::format_duration(d)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<Raw>::deserialize(deserializer)?
                .map(Raw::into_duration::<D::Error>)
                .transpose()
        }
    }
}
