//! Endpoint bookkeeping types.

use std::time::Instant;

use serde::Serialize;

/// Health status of a single endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    /// Registered but not yet probed successfully.
    Unknown,
    /// Eligible for traffic.
    Healthy,
    /// Excluded from selection until a probe succeeds again.
    Unhealthy,
}

/// Last-observed stats reported by a successful probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EndpointStats {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub response_time_ms: f64,
    pub uptime: f64,
}

/// One backend candidate and its health bookkeeping.
///
/// Owned exclusively by the registry; everything outside sees [`EndpointView`]
/// copies.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub status: EndpointStatus,
    pub consecutive_failures: u32,
    /// Most recent probe or forward outcome, success or failure.
    pub last_check: Instant,
    /// Most recent successful probe or forward. Drives eviction.
    pub last_ok: Instant,
    pub added: Instant,
    pub stats: EndpointStats,
}

impl Endpoint {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            status: EndpointStatus::Unknown,
            consecutive_failures: 0,
            last_check: now,
            last_ok: now,
            added: now,
            stats: EndpointStats::default(),
        }
    }
}

/// Point-in-time copy of one endpoint, handed out by registry snapshots.
#[derive(Debug, Clone)]
pub struct EndpointView {
    pub address: String,
    pub status: EndpointStatus,
    pub consecutive_failures: u32,
    pub last_check: Instant,
    pub stats: EndpointStats,
}
