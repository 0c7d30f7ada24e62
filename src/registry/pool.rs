//! The synchronized endpoint pool.
//!
//! # Responsibilities
//! - Own the address → endpoint mapping behind one exclusion point
//! - Apply the failure-accounting state machine for probe and forward outcomes
//! - Evict endpoints that stay silent past the grace window
//! - Trigger best-effort persistence after membership changes

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::persistence::EndpointStore;
use crate::registry::endpoint::{Endpoint, EndpointStats, EndpointStatus, EndpointView};

/// Errors surfaced synchronously from registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid endpoint address: {0}")]
    InvalidAddress(String),

    #[error("endpoint already registered: {0}")]
    Duplicate(String),
}

/// Aggregate read model for the dashboard layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolCounts {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
}

/// Authoritative owner of all endpoint state.
///
/// A `BTreeMap` keeps snapshots in a stable address order, which the
/// round-robin rotation relies on for fairness.
pub struct EndpointRegistry {
    endpoints: RwLock<BTreeMap<String, Endpoint>>,
    max_failures: u32,
    store: Arc<dyn EndpointStore>,
}

impl EndpointRegistry {
    pub fn new(max_failures: u32, store: Arc<dyn EndpointStore>) -> Self {
        Self {
            endpoints: RwLock::new(BTreeMap::new()),
            max_failures,
            store,
        }
    }

    /// Normalize an address to `scheme://host[:port]`.
    ///
    /// The scheme defaults to `http` when missing. Addresses carrying a path,
    /// query, or fragment are rejected rather than silently truncated.
    pub fn normalize(address: &str) -> Result<String, RegistryError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(RegistryError::InvalidAddress(address.to_string()));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        let url = Url::parse(&candidate)
            .map_err(|_| RegistryError::InvalidAddress(address.to_string()))?;

        if !matches!(url.scheme(), "http" | "https")
            || url.host_str().is_none()
            || url.path() != "/"
            || url.query().is_some()
            || url.fragment().is_some()
        {
            return Err(RegistryError::InvalidAddress(address.to_string()));
        }

        Ok(url.origin().ascii_serialization())
    }

    /// Register a new endpoint. It starts as `Unknown` and becomes eligible
    /// for traffic only after its first successful probe.
    pub fn add(&self, address: &str) -> Result<String, RegistryError> {
        let normalized = Self::normalize(address)?;

        let addresses = {
            let mut endpoints = self.endpoints.write().unwrap();
            if endpoints.contains_key(&normalized) {
                return Err(RegistryError::Duplicate(normalized));
            }
            endpoints.insert(normalized.clone(), Endpoint::new(Instant::now()));
            endpoints.keys().cloned().collect::<Vec<_>>()
        };

        tracing::info!(address = %normalized, "endpoint registered");
        self.persist(&addresses);
        Ok(normalized)
    }

    /// Remove an endpoint, reporting whether it was present.
    pub fn remove(&self, address: &str) -> bool {
        let Ok(normalized) = Self::normalize(address) else {
            return false;
        };

        let addresses = {
            let mut endpoints = self.endpoints.write().unwrap();
            if endpoints.remove(&normalized).is_none() {
                return false;
            }
            endpoints.keys().cloned().collect::<Vec<_>>()
        };

        tracing::info!(address = %normalized, "endpoint removed");
        self.persist(&addresses);
        true
    }

    /// Seed the registry from the persisted snapshot. Restored endpoints
    /// carry no stale health claims: they start over as `Unknown`.
    pub fn restore(&self) {
        let persisted = match self.store.load() {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load endpoint snapshot");
                return;
            }
        };

        let now = Instant::now();
        let mut restored = 0usize;
        {
            let mut endpoints = self.endpoints.write().unwrap();
            for raw in persisted {
                if let Ok(normalized) = Self::normalize(&raw) {
                    endpoints
                        .entry(normalized)
                        .or_insert_with(|| Endpoint::new(now));
                    restored += 1;
                } else {
                    tracing::warn!(address = %raw, "skipping malformed persisted address");
                }
            }
        }

        if restored > 0 {
            tracing::info!(count = restored, "restored endpoints from snapshot");
        }
    }

    /// Point-in-time copy of every endpoint, in stable address order.
    pub fn snapshot(&self) -> Vec<EndpointView> {
        let endpoints = self.endpoints.read().unwrap();
        endpoints
            .iter()
            .map(|(address, ep)| EndpointView {
                address: address.clone(),
                status: ep.status,
                consecutive_failures: ep.consecutive_failures,
                last_check: ep.last_check,
                stats: ep.stats,
            })
            .collect()
    }

    /// Snapshot filtered to the healthy subset, the only set eligible for
    /// traffic.
    pub fn healthy_snapshot(&self) -> Vec<EndpointView> {
        self.snapshot()
            .into_iter()
            .filter(|ep| ep.status == EndpointStatus::Healthy)
            .collect()
    }

    pub fn record_probe_success(&self, address: &str, stats: EndpointStats) {
        self.record_success(address, Some(stats));
    }

    pub fn record_probe_failure(&self, address: &str) {
        self.record_failure(address);
    }

    /// A forwarded-request failure counts toward the same threshold as a
    /// failed probe.
    pub fn record_forward_failure(&self, address: &str) {
        self.record_failure(address);
    }

    /// A successfully relayed request is as good a liveness signal as a probe,
    /// minus the stats payload.
    pub fn record_forward_success(&self, address: &str) {
        self.record_success(address, None);
    }

    fn record_success(&self, address: &str, stats: Option<EndpointStats>) {
        let now = Instant::now();
        let mut endpoints = self.endpoints.write().unwrap();
        let Some(ep) = endpoints.get_mut(address) else {
            return;
        };

        let was = ep.status;
        ep.consecutive_failures = 0;
        ep.status = EndpointStatus::Healthy;
        ep.last_check = now;
        ep.last_ok = now;
        if let Some(stats) = stats {
            ep.stats = stats;
        }

        if was == EndpointStatus::Unhealthy {
            tracing::info!(address = %address, "endpoint recovered");
        }
    }

    fn record_failure(&self, address: &str) {
        let now = Instant::now();
        let mut endpoints = self.endpoints.write().unwrap();
        let Some(ep) = endpoints.get_mut(address) else {
            return;
        };

        ep.consecutive_failures += 1;
        ep.last_check = now;
        if ep.consecutive_failures >= self.max_failures && ep.status != EndpointStatus::Unhealthy {
            ep.status = EndpointStatus::Unhealthy;
            tracing::warn!(
                address = %address,
                failures = ep.consecutive_failures,
                "endpoint marked unhealthy"
            );
        }
    }

    /// Remove endpoints that have been registered for more than twice the
    /// probe interval without a single successful contact in that window.
    ///
    /// Both conditions are checked so a newly added endpoint always survives
    /// its first probe cycle.
    pub fn sweep(&self, now: Instant, interval: Duration) {
        let grace = interval * 2;

        let (evicted, addresses) = {
            let mut endpoints = self.endpoints.write().unwrap();
            let doomed: Vec<String> = endpoints
                .iter()
                .filter(|(_, ep)| {
                    now.saturating_duration_since(ep.added) > grace
                        && now.saturating_duration_since(ep.last_ok) > grace
                })
                .map(|(address, _)| address.clone())
                .collect();

            for address in &doomed {
                endpoints.remove(address);
            }
            (doomed, endpoints.keys().cloned().collect::<Vec<_>>())
        };

        if evicted.is_empty() {
            return;
        }
        for address in &evicted {
            tracing::info!(address = %address, "evicted unresponsive endpoint");
        }
        self.persist(&addresses);
    }

    /// Aggregate counts for the dashboard layer.
    pub fn counts(&self) -> PoolCounts {
        let endpoints = self.endpoints.read().unwrap();
        let mut counts = PoolCounts {
            total: endpoints.len(),
            healthy: 0,
            unhealthy: 0,
        };
        for ep in endpoints.values() {
            match ep.status {
                EndpointStatus::Healthy => counts.healthy += 1,
                EndpointStatus::Unhealthy => counts.unhealthy += 1,
                EndpointStatus::Unknown => {}
            }
        }
        counts
    }

    fn persist(&self, addresses: &[String]) {
        if let Err(e) = self.store.save(addresses) {
            tracing::warn!(error = %e, "failed to persist endpoint list");
        }
    }
}
