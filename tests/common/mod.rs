//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use aegis_dispatch::config::DispatcherConfig;
use aegis_dispatch::health::{HealthMonitor, ProberHandle};
use aegis_dispatch::persistence::NullStore;
use aegis_dispatch::registry::EndpointRegistry;
use aegis_dispatch::security::ThreatDetector;
use aegis_dispatch::{HttpServer, Shutdown};

/// Start a mock backend endpoint.
///
/// While `healthy` is set it answers `GET /health` with a JSON stats payload
/// and every other path with `name`; when cleared it answers everything with
/// a 500.
pub async fn start_backend(addr: SocketAddr, name: &'static str, healthy: Arc<AtomicBool>) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let healthy = healthy.clone();
                    tokio::spawn(async move {
                        let body = r#"{"cpu_usage": 12.0, "memory_usage": 34.0, "uptime": 99.0}"#;
                        serve_one(socket, move |path| {
                            if !healthy.load(Ordering::SeqCst) {
                                (500, "unhealthy".to_string())
                            } else if path == "/health" {
                                (200, body.to_string())
                            } else {
                                (200, name.to_string())
                            }
                        })
                        .await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a mock service that answers every request with the same JSON body.
#[allow(dead_code)]
pub async fn start_json_responder(addr: SocketAddr, body: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        serve_one(socket, move |_| (200, body.to_string())).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

async fn serve_one<F>(mut socket: TcpStream, respond: F)
where
    F: FnOnce(&str) -> (u16, String),
{
    let mut buf = vec![0u8; 4096];
    let n = socket.read(&mut buf).await.unwrap_or(0);
    let head = String::from_utf8_lossy(&buf[..n]).to_string();
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();

    let (status, body) = respond(&path);
    let status_text = match status {
        200 => "200 OK",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a full dispatcher (registry + prober + edge server) on `proxy_addr`.
#[allow(dead_code)]
pub async fn start_dispatcher(
    proxy_addr: SocketAddr,
    config: DispatcherConfig,
    detector: Arc<dyn ThreatDetector>,
) -> (Arc<EndpointRegistry>, Shutdown, ProberHandle) {
    let registry = Arc::new(EndpointRegistry::new(
        config.health_check.max_failures,
        Arc::new(NullStore),
    ));

    let prober = HealthMonitor::new(registry.clone(), config.health_check.clone()).start();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, registry.clone(), detector);
    let listener = TcpListener::bind(proxy_addr).await.unwrap();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    (registry, shutdown, prober)
}
