//! Probe response payload.

use serde::Deserialize;

/// Stats a backend reports from its health endpoint.
///
/// Validated at the boundary: the body must be well-formed JSON, individual
/// fields default to zero when absent.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ProbeReport {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub uptime: f64,
}
