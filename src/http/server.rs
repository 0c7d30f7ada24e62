//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router: admin surface plus the forwarding catch-all
//! - Wire up middleware (request ID, tracing)
//! - Run the server with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, routing::any, Router};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin;
use crate::balancer::{RoundRobin, Selector};
use crate::config::DispatcherConfig;
use crate::http::forward;
use crate::http::request::{RequestUuid, X_REQUEST_ID};
use crate::registry::EndpointRegistry;
use crate::security::ThreatDetector;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<EndpointRegistry>,
    pub selector: Arc<dyn Selector>,
    pub detector: Arc<dyn ThreatDetector>,
    pub client: Client<HttpConnector, Body>,
    pub forward_timeout: Duration,
}

/// HTTP server for the dispatcher edge.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(
        config: &DispatcherConfig,
        registry: Arc<EndpointRegistry>,
        detector: Arc<dyn ThreatDetector>,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            registry,
            selector: Arc::new(RoundRobin::new()),
            detector,
            client,
            forward_timeout: Duration::from_secs(config.forward.timeout_secs),
        };

        Self {
            router: Self::build_router(state),
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .merge(admin::routes())
            .route("/", any(forward::handle))
            .route("/{*path}", any(forward::handle))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(RequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "http server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("http server stopped");
        Ok(())
    }
}

/// Request id assigned by the middleware, for log correlation.
pub(crate) fn request_id(headers: &axum::http::HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}
