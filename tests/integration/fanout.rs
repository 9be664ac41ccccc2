//! Cross-tenant fan-out aggregation tests
//!
//! These tests verify that:
//! - Results merge across tenants in global timestamp order
//! - The per-app limit guarantees every tenant a minimal page
//! - A failing tenant is silently under-represented, never fatal
//! - Only registry unavailability fails the aggregate request

use std::sync::Arc;

use async_trait::async_trait;
use logvault::error::{VaultError, VaultResult};
use logvault::gateway::Gateway;
use logvault::registry::{MemoryRegistry, TenantRegistry};
use logvault::storage::error::StorageError;
use logvault::storage::LogQuery;
use logvault::TenantRegistration;
use pretty_assertions::assert_eq;

use super::helpers::{draft_at, memory_config, memory_gateway};

/// Registry wrapper that fails `get` for one designated app, simulating an
/// unreachable shard during fan-out.
struct FlakyRegistry {
    inner: MemoryRegistry,
    broken_app: String,
}

#[async_trait]
impl TenantRegistry for FlakyRegistry {
    async fn register(
        &self,
        app_id: &str,
        name: &str,
        health_urls: Vec<String>,
    ) -> VaultResult<TenantRegistration> {
        self.inner.register(app_id, name, health_urls).await
    }

    async fn get(&self, app_id: &str) -> VaultResult<TenantRegistration> {
        if app_id == self.broken_app {
            return Err(VaultError::Storage(StorageError::BackendError(
                "simulated outage".to_string(),
            )));
        }
        self.inner.get(app_id).await
    }

    async fn list(&self) -> VaultResult<Vec<String>> {
        self.inner.list().await
    }

    async fn delete(&self, app_id: &str) -> VaultResult<()> {
        self.inner.delete(app_id).await
    }
}

/// Registry whose `list` always fails, simulating total unavailability.
struct DownRegistry;

#[async_trait]
impl TenantRegistry for DownRegistry {
    async fn register(
        &self,
        _app_id: &str,
        _name: &str,
        _health_urls: Vec<String>,
    ) -> VaultResult<TenantRegistration> {
        Err(VaultError::Storage(StorageError::ConnectionFailed(
            "registry down".to_string(),
        )))
    }

    async fn get(&self, _app_id: &str) -> VaultResult<TenantRegistration> {
        Err(VaultError::Storage(StorageError::ConnectionFailed(
            "registry down".to_string(),
        )))
    }

    async fn list(&self) -> VaultResult<Vec<String>> {
        Err(VaultError::Storage(StorageError::ConnectionFailed(
            "registry down".to_string(),
        )))
    }

    async fn delete(&self, _app_id: &str) -> VaultResult<()> {
        Err(VaultError::Storage(StorageError::ConnectionFailed(
            "registry down".to_string(),
        )))
    }
}

async fn seed_entries(gateway: &Gateway, app_id: &str, count: usize, hour_base: usize) {
    for i in 0..count {
        gateway
            .write_log(
                app_id,
                draft_at(
                    "INFO",
                    &format!("2026-08-07T{:02}:{:02}:00Z", hour_base, i),
                    &format!("{app_id}-{i}"),
                ),
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_empty_registry_yields_empty_page() {
    let gateway = memory_gateway();
    let merged = gateway
        .query_all_tenants(&LogQuery::default(), 50)
        .await
        .unwrap();
    assert!(merged.is_empty());
}

#[tokio::test]
async fn test_two_tenant_merge_and_truncation() {
    let gateway = memory_gateway();
    gateway.register_tenant("app-a", "A", Vec::new()).await.unwrap();
    gateway.register_tenant("app-b", "B", Vec::new()).await.unwrap();

    seed_entries(&gateway, "app-a", 10, 1).await;
    seed_entries(&gateway, "app-b", 5, 2).await;

    // per_app_limit = max(10, ceil(12 / 2)) = 10, so A contributes 10 and
    // B all 5; merged 15 entries truncate to the global limit of 12.
    let merged = gateway
        .query_all_tenants(&LogQuery::default(), 12)
        .await
        .unwrap();
    assert_eq!(merged.len(), 12);

    // Globally ordered newest-first: all of B (hour 02) precedes A (hour 01)
    let timestamps: Vec<&str> = merged.iter().map(|e| e.entry.timestamp.as_str()).collect();
    let mut sorted = timestamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(timestamps, sorted);

    assert!(merged.iter().take(5).all(|e| e.app_id == "app-b"));
    assert!(merged.iter().skip(5).all(|e| e.app_id == "app-a"));

    gateway.shutdown_all().await;
}

#[tokio::test]
async fn test_entries_are_tagged_with_source_app() {
    let gateway = memory_gateway();
    gateway.register_tenant("app-a", "A", Vec::new()).await.unwrap();
    seed_entries(&gateway, "app-a", 2, 1).await;

    let merged = gateway
        .query_all_tenants(&LogQuery::default(), 10)
        .await
        .unwrap();
    assert!(merged.iter().all(|e| e.app_id == "app-a"));

    gateway.shutdown_all().await;
}

#[tokio::test]
async fn test_offset_is_dropped_during_fanout() {
    let gateway = memory_gateway();
    gateway.register_tenant("app-a", "A", Vec::new()).await.unwrap();
    seed_entries(&gateway, "app-a", 3, 1).await;

    // If the offset were forwarded per tenant, nothing would come back
    let merged = gateway
        .query_all_tenants(
            &LogQuery {
                offset: Some(5),
                ..Default::default()
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(merged.len(), 3);

    gateway.shutdown_all().await;
}

#[tokio::test]
async fn test_failing_tenant_contributes_nothing() {
    let registry = Arc::new(FlakyRegistry {
        inner: MemoryRegistry::new(),
        broken_app: "app-b".to_string(),
    });
    let gateway = Gateway::new(registry, &memory_config());

    gateway.register_tenant("app-a", "A", Vec::new()).await.unwrap();
    seed_entries(&gateway, "app-a", 4, 1).await;

    // app-b is registered but its shard resolution fails during fan-out
    gateway.register_tenant("app-b", "B", Vec::new()).await.unwrap();

    let merged = gateway
        .query_all_tenants(&LogQuery::default(), 12)
        .await
        .unwrap();
    assert_eq!(merged.len(), 4);
    assert!(merged.iter().all(|e| e.app_id == "app-a"));

    gateway.shutdown_all().await;
}

#[tokio::test]
async fn test_registry_unavailability_is_fatal() {
    let gateway = Gateway::new(Arc::new(DownRegistry), &memory_config());

    let result = gateway.query_all_tenants(&LogQuery::default(), 10).await;
    assert!(matches!(result, Err(VaultError::Storage(_))));
}

#[tokio::test]
async fn test_level_filter_applies_across_tenants() {
    let gateway = memory_gateway();
    gateway.register_tenant("app-a", "A", Vec::new()).await.unwrap();
    gateway.register_tenant("app-b", "B", Vec::new()).await.unwrap();

    gateway
        .write_log("app-a", draft_at("ERROR", "2026-08-07T01:00:00Z", "a-err"))
        .await
        .unwrap();
    gateway
        .write_log("app-a", draft_at("INFO", "2026-08-07T02:00:00Z", "a-info"))
        .await
        .unwrap();
    gateway
        .write_log("app-b", draft_at("ERROR", "2026-08-07T03:00:00Z", "b-err"))
        .await
        .unwrap();

    let merged = gateway
        .query_all_tenants(
            &LogQuery {
                level: Some(logvault::LogLevel::Error),
                ..Default::default()
            },
            10,
        )
        .await
        .unwrap();

    let messages: Vec<&str> = merged.iter().map(|e| e.entry.message.as_str()).collect();
    assert_eq!(messages, vec!["b-err", "a-err"]);

    gateway.shutdown_all().await;
}
