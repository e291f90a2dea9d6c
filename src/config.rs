//! Configuration management for Slidegate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Main configuration for the Slidegate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlidegateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Admission limiter configuration
    #[serde(default)]
    pub limiter: LimiterConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:8090".parse().unwrap()
}

/// Admission limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Rate rule installed at startup. With no rule the limiter fails open
    /// until one is set through the administrative endpoint.
    pub rule: Option<RuleConfig>,

    /// Seconds between staleness sweeps of client window state.
    /// Zero disables the sweep.
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,

    /// Client state is evicted once idle for this many full windows.
    #[serde(default = "default_stale_windows")]
    pub stale_windows: u32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            rule: None,
            eviction_interval_secs: default_eviction_interval_secs(),
            stale_windows: default_stale_windows(),
        }
    }
}

fn default_eviction_interval_secs() -> u64 {
    60
}

fn default_stale_windows() -> u32 {
    10
}

/// A rate rule as expressed in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Number of requests allowed per unit of time
    pub max_requests: u64,
    /// The time unit
    pub unit: TimeUnit,
}

/// Time unit for rate rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Get the duration of this time unit.
    pub fn duration(&self) -> Duration {
        match self {
            TimeUnit::Second => Duration::from_secs(1),
            TimeUnit::Minute => Duration::from_secs(60),
            TimeUnit::Hour => Duration::from_secs(3600),
            TimeUnit::Day => Duration::from_secs(86400),
        }
    }
}

impl SlidegateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SlidegateConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::SlidegateError::Config(e.to_string()))?;
        Ok(config)
    }
}
