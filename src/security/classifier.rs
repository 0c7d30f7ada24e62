//! Suspicious-IP predicate implementations.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Deserialize;
use tokio::time;

/// Boolean verdict on a client IP, consumed by the forwarder.
#[async_trait]
pub trait ThreatDetector: Send + Sync {
    async fn is_suspicious(&self, ip: IpAddr) -> bool;
}

/// Detector used when no classifier is configured.
pub struct AllowAll;

#[async_trait]
impl ThreatDetector for AllowAll {
    async fn is_suspicious(&self, _ip: IpAddr) -> bool {
        false
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Verdict {
    suspicious: bool,
}

/// HTTP-backed classifier client.
///
/// Issues `GET {url}?ip={ip}` and expects `{"suspicious": bool}`. Timeouts,
/// transport errors, non-success statuses, and malformed bodies all fail
/// open.
pub struct RemoteClassifier {
    client: Client<HttpConnector, Body>,
    url: String,
    timeout: Duration,
}

impl RemoteClassifier {
    pub fn new(url: String, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            url,
            timeout,
        }
    }
}

#[async_trait]
impl ThreatDetector for RemoteClassifier {
    async fn is_suspicious(&self, ip: IpAddr) -> bool {
        let uri = format!("{}?ip={}", self.url, ip);
        let request = match Request::builder().uri(uri).body(Body::empty()) {
            Ok(req) => req,
            Err(e) => {
                tracing::debug!(error = %e, "failed to build classifier request, allowing");
                return false;
            }
        };

        let response = match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => response,
            Ok(Ok(response)) => {
                tracing::debug!(ip = %ip, status = %response.status(), "classifier error, allowing");
                return false;
            }
            Ok(Err(e)) => {
                tracing::debug!(ip = %ip, error = %e, "classifier unreachable, allowing");
                return false;
            }
            Err(_) => {
                tracing::debug!(ip = %ip, "classifier timed out, allowing");
                return false;
            }
        };

        let bytes = match axum::body::to_bytes(Body::new(response.into_body()), 4 * 1024).await {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let verdict: Verdict = serde_json::from_slice(&bytes).unwrap_or_default();

        if verdict.suspicious {
            tracing::warn!(ip = %ip, "classifier flagged suspicious ip");
        }
        verdict.suspicious
    }
}
