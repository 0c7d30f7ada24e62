//! Request forwarding.
//!
//! # Responsibilities
//! - Gate requests through the suspicious-IP predicate
//! - Pick a healthy endpoint and relay the request to it, once
//! - Feed the outcome back into the registry
//!
//! The forwarder is a transparent relay: on success the upstream response
//! goes back unchanged. Retrying against another endpoint is the caller's
//! decision, never the forwarder's.

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{
        uri::{Parts, PathAndQuery, Uri},
        HeaderMap, Request, StatusCode,
    },
    response::{IntoResponse, Response},
};

use crate::http::server::{request_id, AppState};

pub async fn handle(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let request_id = request_id(request.headers()).to_string();
    let ip = client_ip(request.headers(), peer);

    if state.detector.is_suspicious(ip).await {
        tracing::warn!(request_id = %request_id, ip = %ip, "request blocked");
        return (StatusCode::FORBIDDEN, "Request blocked").into_response();
    }

    let healthy = state.registry.healthy_snapshot();
    let Some(target) = state.selector.pick(&healthy) else {
        tracing::warn!(request_id = %request_id, "no healthy endpoints available");
        return (StatusCode::SERVICE_UNAVAILABLE, "No healthy endpoints available")
            .into_response();
    };

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        address = %target.address,
        "forwarding request"
    );

    let (mut parts, body) = request.into_parts();
    parts.uri = match rewrite_uri(&parts.uri, &target.address) {
        Some(uri) => uri,
        None => {
            tracing::error!(request_id = %request_id, address = %target.address, "failed to rewrite uri");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid upstream address")
                .into_response();
        }
    };
    let upstream_request = Request::from_parts(parts, body);

    match tokio::time::timeout(state.forward_timeout, state.client.request(upstream_request)).await
    {
        Ok(Ok(response)) => {
            state.registry.record_forward_success(&target.address);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Ok(Err(e)) => {
            tracing::error!(
                request_id = %request_id,
                address = %target.address,
                error = %e,
                "upstream request failed"
            );
            state.registry.record_forward_failure(&target.address);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
        Err(_) => {
            tracing::error!(
                request_id = %request_id,
                address = %target.address,
                "upstream request timed out"
            );
            state.registry.record_forward_failure(&target.address);
            (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
        }
    }
}

/// Client IP for the suspicious-IP gate: first `X-Forwarded-For` hop when
/// present, else the peer address.
fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_else(|| peer.ip())
}

/// Point the request at the chosen endpoint, keeping path and query intact.
fn rewrite_uri(original: &Uri, address: &str) -> Option<Uri> {
    let target: Uri = address.parse().ok()?;

    let mut parts = Parts::default();
    parts.scheme = target.scheme().cloned();
    parts.authority = target.authority().cloned();
    parts.path_and_query = original
        .path_and_query()
        .cloned()
        .or_else(|| Some(PathAndQuery::from_static("/")));

    Uri::from_parts(parts).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_replaces_scheme_and_authority_only() {
        let original: Uri = "/api/items?page=2".parse().unwrap();
        let rewritten = rewrite_uri(&original, "http://10.0.0.5:8081").unwrap();
        assert_eq!(rewritten.to_string(), "http://10.0.0.5:8081/api/items?page=2");
    }

    #[test]
    fn rewrite_defaults_to_root_path() {
        let original = Uri::default();
        let rewritten = rewrite_uri(&original, "http://10.0.0.5:8081").unwrap();
        assert_eq!(rewritten.to_string(), "http://10.0.0.5:8081/");
    }

    #[test]
    fn forwarded_header_wins_over_peer() {
        let peer: SocketAddr = "192.168.1.1:4242".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.9.8.7, 172.16.0.1".parse().unwrap());

        assert_eq!(client_ip(&headers, peer), "10.9.8.7".parse::<IpAddr>().unwrap());
        assert_eq!(client_ip(&HeaderMap::new(), peer), peer.ip());
    }
}
