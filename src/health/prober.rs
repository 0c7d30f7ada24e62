//! Active health probing.
//!
//! # Responsibilities
//! - Periodically probe every registered endpoint
//! - Update registry state based on results
//! - Run the eviction sweep after each tick

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Request;
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::report::ProbeReport;
use crate::lifecycle::Shutdown;
use crate::registry::{EndpointRegistry, EndpointStats};

/// Handle to the running health monitor task.
///
/// Dropping the handle abandons the task; call [`ProberHandle::stop`] to
/// signal cancellation and wait for the loop to exit.
pub struct ProberHandle {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl ProberHandle {
    /// Signal the monitor to stop and wait for it to finish. No probe
    /// outcome is recorded after this returns.
    pub async fn stop(self) {
        self.shutdown.trigger();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "health monitor task aborted");
        }
    }
}

pub struct HealthMonitor {
    registry: Arc<EndpointRegistry>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<EndpointRegistry>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            registry,
            config,
            client,
        }
    }

    /// Spawn the probe loop and return its handle.
    pub fn start(self) -> ProberHandle {
        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        let task = tokio::spawn(self.run(receiver));
        ProberHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs);
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                    self.registry.sweep(Instant::now(), interval);
                }
                _ = shutdown.recv() => {
                    tracing::info!("health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every known endpoint concurrently and wait for the whole tick
    /// to settle.
    async fn check_all(&self) {
        let addresses: Vec<String> = self
            .registry
            .snapshot()
            .into_iter()
            .map(|ep| ep.address)
            .collect();

        join_all(addresses.into_iter().map(|address| self.probe(address))).await;
    }

    async fn probe(&self, address: String) {
        let uri = format!("{}{}", address, self.config.path);
        let request = match Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "aegis-dispatch-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(address = %address, error = %e, "failed to build probe request");
                self.registry.record_probe_failure(&address);
                return;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let started = Instant::now();

        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => {
                let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;
                match read_report(response.into_body()).await {
                    Some(report) => {
                        self.registry.record_probe_success(
                            &address,
                            EndpointStats {
                                cpu_usage: report.cpu_usage,
                                memory_usage: report.memory_usage,
                                response_time_ms,
                                uptime: report.uptime,
                            },
                        );
                    }
                    None => {
                        tracing::warn!(address = %address, "probe failed: malformed health payload");
                        self.registry.record_probe_failure(&address);
                    }
                }
            }
            Ok(Ok(response)) => {
                tracing::warn!(
                    address = %address,
                    status = %response.status(),
                    "probe failed: non-success status"
                );
                self.registry.record_probe_failure(&address);
            }
            Ok(Err(e)) => {
                tracing::warn!(address = %address, error = %e, "probe failed: connection error");
                self.registry.record_probe_failure(&address);
            }
            Err(_) => {
                tracing::warn!(address = %address, "probe failed: timeout");
                self.registry.record_probe_failure(&address);
            }
        }
    }
}

/// Health payloads are small; anything past this is not a health report.
const MAX_REPORT_BYTES: usize = 64 * 1024;

async fn read_report(body: hyper::body::Incoming) -> Option<ProbeReport> {
    let bytes = axum::body::to_bytes(Body::new(body), MAX_REPORT_BYTES)
        .await
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}
