//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatcher.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Health probing settings.
    pub health_check: HealthCheckConfig,

    /// Request forwarding settings.
    pub forward: ForwardConfig,

    /// Endpoint snapshot persistence settings.
    pub persistence: PersistenceConfig,

    /// Suspicious-IP classifier settings.
    pub classifier: ClassifierConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Health probing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Path to probe on each endpoint.
    pub path: String,

    /// Number of consecutive failures before marking an endpoint unhealthy.
    pub max_failures: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            timeout_secs: 5,
            path: "/health".to_string(),
            max_failures: 3,
        }
    }
}

/// Request forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Upstream relay timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Endpoint snapshot persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Path of the JSON snapshot holding the endpoint address list.
    pub path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: "endpoints.json".to_string(),
        }
    }
}

/// Suspicious-IP classifier configuration.
///
/// The classifier is an external service; when disabled or unreachable the
/// dispatcher forwards everything (fail-open).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Enable the suspicious-IP gate.
    pub enabled: bool,

    /// Classifier endpoint URL.
    pub url: String,

    /// Classifier call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            timeout_ms: 500,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
