//! End-to-end dispatching tests: probing, rotation, exclusion, blocking.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aegis_dispatch::config::DispatcherConfig;
use aegis_dispatch::security::{AllowAll, RemoteClassifier};

mod common;

fn test_config(proxy_addr: SocketAddr) -> DispatcherConfig {
    let mut config = DispatcherConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.health_check.interval_secs = 1;
    config.health_check.timeout_secs = 1;
    config.health_check.max_failures = 3;
    config
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn probe_marks_healthy_then_round_robin_rotates() {
    let b1: SocketAddr = "127.0.0.1:28411".parse().unwrap();
    let b2: SocketAddr = "127.0.0.1:28412".parse().unwrap();
    let b3: SocketAddr = "127.0.0.1:28413".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:28414".parse().unwrap();

    for (addr, name) in [(b1, "b1"), (b2, "b2"), (b3, "b3")] {
        common::start_backend(addr, name, Arc::new(AtomicBool::new(true))).await;
    }

    let (_registry, shutdown, prober) =
        common::start_dispatcher(proxy, test_config(proxy), Arc::new(AllowAll)).await;

    let client = client();
    for addr in [b1, b2, b3] {
        let res = client
            .post(format!("http://{proxy}/api/dispatcher/endpoints"))
            .json(&serde_json::json!({ "url": addr.to_string() }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 201);
    }

    // Give the prober time to mark everything healthy.
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let stats: serde_json::Value = client
        .get(format!("http://{proxy}/api/dispatcher/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["healthy"], 3);

    // Addresses rotate in stable (sorted) order, wrapping after one cycle.
    let mut bodies = Vec::new();
    for _ in 0..6 {
        let body = client
            .get(format!("http://{proxy}/"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        bodies.push(body);
    }
    assert_eq!(bodies, vec!["b1", "b2", "b3", "b1", "b2", "b3"]);

    shutdown.trigger();
    prober.stop().await;
}

#[tokio::test]
async fn unhealthy_endpoint_is_excluded_from_rotation() {
    let b1: SocketAddr = "127.0.0.1:28421".parse().unwrap();
    let b2: SocketAddr = "127.0.0.1:28422".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:28423".parse().unwrap();

    common::start_backend(b1, "b1", Arc::new(AtomicBool::new(true))).await;
    let b2_healthy = Arc::new(AtomicBool::new(true));
    common::start_backend(b2, "b2", b2_healthy.clone()).await;

    let (registry, shutdown, prober) =
        common::start_dispatcher(proxy, test_config(proxy), Arc::new(AllowAll)).await;
    registry.add(&b1.to_string()).unwrap();
    registry.add(&b2.to_string()).unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;

    let client = client();
    let mut b2_hits = 0;
    for _ in 0..4 {
        let body = client
            .get(format!("http://{proxy}/"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        if body == "b2" {
            b2_hits += 1;
        }
    }
    assert!(b2_hits > 0, "b2 should receive traffic while healthy");

    // Three consecutive probe failures demote b2.
    b2_healthy.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(4500)).await;

    let stats: serde_json::Value = client
        .get(format!("http://{proxy}/api/dispatcher/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["healthy"], 1);
    assert_eq!(stats["unhealthy"], 1);

    for _ in 0..6 {
        let body = client
            .get(format!("http://{proxy}/"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "b1", "only b1 should be selected after demotion");
    }

    shutdown.trigger();
    prober.stop().await;
}

#[tokio::test]
async fn empty_healthy_pool_yields_503() {
    let proxy: SocketAddr = "127.0.0.1:28431".parse().unwrap();

    let (_registry, shutdown, prober) =
        common::start_dispatcher(proxy, test_config(proxy), Arc::new(AllowAll)).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let res = client()
        .get(format!("http://{proxy}/anything"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);

    shutdown.trigger();
    prober.stop().await;
}

#[tokio::test]
async fn suspicious_ip_is_blocked_before_selection() {
    let classifier_addr: SocketAddr = "127.0.0.1:28441".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:28442".parse().unwrap();

    common::start_json_responder(classifier_addr, r#"{"suspicious": true}"#).await;

    let detector = Arc::new(RemoteClassifier::new(
        format!("http://{classifier_addr}/predict"),
        Duration::from_millis(500),
    ));
    let (_registry, shutdown, prober) =
        common::start_dispatcher(proxy, test_config(proxy), detector).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Blocked outright: a 403 even though the pool is empty, because the
    // gate runs before endpoint selection.
    let res = client()
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    shutdown.trigger();
    prober.stop().await;
}

#[tokio::test]
async fn admin_surface_validates_membership_operations() {
    let proxy: SocketAddr = "127.0.0.1:28451".parse().unwrap();

    let mut config = test_config(proxy);
    // Long interval keeps the prober quiet while we exercise the admin API.
    config.health_check.interval_secs = 60;

    let (_registry, shutdown, prober) =
        common::start_dispatcher(proxy, config, Arc::new(AllowAll)).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let client = client();
    let endpoints_url = format!("http://{proxy}/api/dispatcher/endpoints");

    let res = client
        .post(&endpoints_url)
        .json(&serde_json::json!({ "url": "10.0.0.1:9000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    // Same address spelled differently is still a duplicate.
    let res = client
        .post(&endpoints_url)
        .json(&serde_json::json!({ "url": "http://10.0.0.1:9000/" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 409);

    let res = client
        .post(&endpoints_url)
        .json(&serde_json::json!({ "url": "not a url at all" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let list: serde_json::Value = client
        .get(&endpoints_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let endpoints = list["endpoints"].as_array().unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0]["address"], "http://10.0.0.1:9000");
    assert_eq!(endpoints[0]["status"], "unknown");
    assert_eq!(endpoints[0]["failures"], 0);

    let res = client
        .delete(&endpoints_url)
        .json(&serde_json::json!({ "url": "10.0.0.1:9000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .delete(&endpoints_url)
        .json(&serde_json::json!({ "url": "10.0.0.1:9000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
    prober.stop().await;
}
