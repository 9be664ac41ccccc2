//! Health-check scheduler and probe tests
//!
//! These tests verify that:
//! - A probe cycle records one row per configured URL
//! - Transport failures become `status = None` rows, not errors
//! - The timer-driven cycle runs without any request traffic
//! - Health history filters by URL

use logvault::storage::HealthQuery;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::helpers::{fast_health_config, memory_gateway};
use logvault::gateway::Gateway;
use logvault::registry::MemoryRegistry;
use std::sync::Arc;

async fn healthy_endpoint(server: &MockServer, route: &str) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    format!("{}{route}", server.uri())
}

#[tokio::test]
async fn test_check_now_records_one_row_per_url() {
    let server = MockServer::start().await;
    let ok_url = healthy_endpoint(&server, "/health").await;

    Mock::given(method("GET"))
        .and(path("/degraded"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let degraded_url = format!("{}/degraded", server.uri());

    // Nothing listens on port 9; this probe fails at the transport level
    let dead_url = "http://127.0.0.1:9/health".to_string();

    let gateway = memory_gateway();
    gateway
        .register_tenant(
            "app-1",
            "App One",
            vec![ok_url.clone(), degraded_url.clone(), dead_url.clone()],
        )
        .await
        .unwrap();

    let recorded = gateway.check_now("app-1").await.unwrap();
    assert_eq!(recorded, 3);

    let history = gateway
        .query_health("app-1", HealthQuery::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 3);

    let ok_row = history.iter().find(|r| r.url == ok_url).unwrap();
    assert_eq!(ok_row.status, Some(200));
    assert!(ok_row.latency_ms.is_some());

    // A non-2xx response is still a response: probe-level failure is data
    let degraded_row = history.iter().find(|r| r.url == degraded_url).unwrap();
    assert_eq!(degraded_row.status, Some(503));

    let dead_row = history.iter().find(|r| r.url == dead_url).unwrap();
    assert_eq!(dead_row.status, None);
    assert_eq!(dead_row.latency_ms, None);

    gateway.shutdown_all().await;
}

#[tokio::test]
async fn test_timer_runs_cycles_without_traffic() {
    let server = MockServer::start().await;
    let url = healthy_endpoint(&server, "/health").await;

    let gateway = Gateway::new(Arc::new(MemoryRegistry::new()), &fast_health_config());
    gateway
        .register_tenant("app-1", "App One", vec![url])
        .await
        .unwrap();

    // interval_secs = 1; after ~2.5s at least two cycles have run with no
    // writes or queries issued against the tenant
    tokio::time::sleep(std::time::Duration::from_millis(2_500)).await;

    let history = gateway
        .query_health("app-1", HealthQuery::default())
        .await
        .unwrap();
    assert!(
        history.len() >= 2,
        "expected at least 2 recorded cycles, got {}",
        history.len()
    );
    assert!(history.iter().all(|r| r.status == Some(200)));

    gateway.shutdown_all().await;
}

#[tokio::test]
async fn test_set_health_urls_takes_effect() {
    let server = MockServer::start().await;
    let url = healthy_endpoint(&server, "/health").await;

    let gateway = memory_gateway();
    gateway
        .register_tenant("app-1", "App One", Vec::new())
        .await
        .unwrap();

    // No URLs configured yet: a manual cycle records nothing
    assert_eq!(gateway.check_now("app-1").await.unwrap(), 0);

    gateway
        .set_health_urls("app-1", vec![url.clone()])
        .await
        .unwrap();
    assert_eq!(gateway.check_now("app-1").await.unwrap(), 1);

    let history = gateway
        .query_health("app-1", HealthQuery::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].url, url);

    gateway.shutdown_all().await;
}

#[tokio::test]
async fn test_health_history_filters_by_url() {
    let server = MockServer::start().await;
    let first = healthy_endpoint(&server, "/first").await;
    let second = healthy_endpoint(&server, "/second").await;

    let gateway = memory_gateway();
    gateway
        .register_tenant("app-1", "App One", vec![first.clone(), second])
        .await
        .unwrap();

    gateway.check_now("app-1").await.unwrap();
    gateway.check_now("app-1").await.unwrap();

    let filtered = gateway
        .query_health(
            "app-1",
            HealthQuery {
                url: Some(first.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|r| r.url == first));

    gateway.shutdown_all().await;
}
