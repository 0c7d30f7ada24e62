//! Health-Aware Request Dispatcher
//!
//! A self-monitoring dispatcher built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                  DISPATCHER                   │
//!                        │                                               │
//!   Client Request       │  ┌────────┐   ┌──────────┐   ┌───────────┐   │
//!   ─────────────────────┼─▶│  http  │──▶│ security │──▶│ balancer  │   │
//!                        │  │ server │   │ ip gate  │   │ selector  │   │
//!                        │  └────────┘   └──────────┘   └─────┬─────┘   │
//!                        │                                    │         │
//!   Client Response      │  ┌────────┐                  ┌─────▼─────┐   │      Backend
//!   ◀────────────────────┼──│ relay  │◀─────────────────│ registry  │◀──┼────  Endpoints
//!                        │  └────────┘                  └─────▲─────┘   │
//!                        │                                    │         │
//!                        │  ┌─────────────────┐         ┌─────┴─────┐   │
//!                        │  │   persistence   │◀────────│  health   │   │
//!                        │  │    snapshot     │         │  prober   │   │
//!                        │  └─────────────────┘         └───────────┘   │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aegis_dispatch::config::{load_config, DispatcherConfig};
use aegis_dispatch::health::HealthMonitor;
use aegis_dispatch::persistence::{EndpointStore, JsonFileStore};
use aegis_dispatch::registry::EndpointRegistry;
use aegis_dispatch::security::{AllowAll, RemoteClassifier, ThreatDetector};
use aegis_dispatch::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "aegis-dispatch")]
#[command(about = "Health-aware request dispatcher", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DispatcherConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "aegis_dispatch={},tower_http=info",
                    config.observability.log_level
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        bind_address = %config.listener.bind_address,
        probe_interval_secs = config.health_check.interval_secs,
        max_failures = config.health_check.max_failures,
        "configuration loaded"
    );

    // Registry, seeded from the persisted snapshot.
    let store: Arc<dyn EndpointStore> = Arc::new(JsonFileStore::new(&config.persistence.path));
    let registry = Arc::new(EndpointRegistry::new(
        config.health_check.max_failures,
        store,
    ));
    registry.restore();

    let detector: Arc<dyn ThreatDetector> = if config.classifier.enabled {
        tracing::info!(url = %config.classifier.url, "suspicious-ip classifier enabled");
        Arc::new(RemoteClassifier::new(
            config.classifier.url.clone(),
            Duration::from_millis(config.classifier.timeout_ms),
        ))
    } else {
        Arc::new(AllowAll)
    };

    let prober = HealthMonitor::new(registry.clone(), config.health_check.clone()).start();

    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
                shutdown.trigger();
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config, registry, detector);
    server.run(listener, shutdown.subscribe()).await?;

    // Stop probing only after the listener is down, so nothing mutates
    // registry state once shutdown completes.
    prober.stop().await;

    tracing::info!("shutdown complete");
    Ok(())
}
