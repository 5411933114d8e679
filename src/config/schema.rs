//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.

use serde::{Deserialize, Serialize};

/// Root configuration for the forward proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, session limit).
    pub listener: ListenerConfig,

    /// Request parsing and relay buffer settings.
    pub relay: RelayConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind; loopback unless overridden.
    pub host: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum concurrent sessions. Unbounded when absent.
    pub max_connections: Option<usize>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_connections: None,
        }
    }
}

/// Buffer sizing for parsing and relaying.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Bytes read per call, both while parsing and while relaying.
    pub buffer_size: usize,

    /// Largest request head accepted before the session is aborted.
    pub max_head_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            max_head_bytes: 64 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Origin connect timeout in seconds (0 = leave it to the OS).
    pub connect_secs: u64,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus scrape endpoint. Metrics export is off when absent.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}
