//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal (or absent) config file works.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the snapshot proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Proxymap file location.
    pub proxymap: ProxymapConfig,

    /// Request classification settings.
    pub routing: RoutingConfig,

    /// Upstream retry settings.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Proxymap file configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxymapConfig {
    /// Path to the proxymap JSON file. Required at startup; an unreadable
    /// or invalid file is fatal.
    pub path: PathBuf,
}

/// Request classification settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Hostname that stands in for "the local rendering server". Requests
    /// whose host classifies as local are rewritten to this hostname before
    /// the proxymap lookup, and proxymap keys for local resources are
    /// expressed against it.
    pub proxyme_hostname: String,

    /// Extra hostnames to pre-mark as local at startup, in addition to
    /// `localhost`, `127.0.0.1`, and the proxy-me hostname (e.g. harness
    /// aliases like "testserver").
    pub local_hostnames: Vec<String>,

    /// URL prefixes that must never be fetched from the live internet.
    /// Literal prefix match, no wildcards.
    pub blacklist_prefixes: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            proxyme_hostname: "proxyme".to_string(),
            local_hostnames: Vec::new(),
            // Blocks Firefox from downloading a hefty video codec in the
            // background during renders.
            blacklist_prefixes: vec!["http://ciscobinary.openh264.org:80".to_string()],
        }
    }
}

/// Upstream retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Number of retries after the initial attempt. Applies to transport
    /// errors and 5xx responses alike; retries are immediate, no backoff.
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total per-request timeout in seconds, covering all retry attempts.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides.
    pub log_level: String,

    /// Enable the Prometheus metrics exporter. Off by default: render hosts
    /// run one proxy per browser and a fixed exporter port would collide.
    pub metrics_enabled: bool,

    /// Metrics exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
