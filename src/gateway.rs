//! Gateway - single-tenant delegation and cross-tenant fan-out
//!
//! The gateway is what the (external) API layer talks to. Single-tenant
//! requests resolve the target shard and delegate; "all tenants" queries
//! fan out to every shard named by the registry in parallel and merge
//! client-side.
//!
//! Aggregation is best-effort by design: a tenant whose query fails or
//! times out contributes an empty result set and is under-represented in
//! the merged page instead of failing the request. Only registry
//! unavailability fails an aggregate query.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::actors::manager::ShardManager;
use crate::actors::shard::ShardHandle;
use crate::config::{Config, FanoutConfig};
use crate::error::VaultResult;
use crate::registry::TenantRegistry;
use crate::storage::{HealthQuery, LogQuery};
use crate::{
    AggregatedLogEntry, DailyStatCounter, HealthCheckResult, LogDraft, LogEntry,
    TenantRegistration,
};

/// Smallest page any tenant is granted during fan-out
pub const MIN_PER_APP_LIMIT: usize = 10;

/// Per-tenant page size for a fan-out query
///
/// Guarantees every tenant can contribute a minimally useful page even when
/// the tenant count is large, while bounding total fan-out volume.
pub fn per_app_limit(global_limit: usize, tenant_count: usize) -> usize {
    MIN_PER_APP_LIMIT.max(global_limit.div_ceil(tenant_count.max(1)))
}

/// Front door for all tenant operations
pub struct Gateway {
    registry: Arc<dyn TenantRegistry>,
    shards: ShardManager,
    fanout: FanoutConfig,
}

impl Gateway {
    pub fn new(registry: Arc<dyn TenantRegistry>, config: &Config) -> Self {
        let storage = config.storage.clone().unwrap_or_default();
        Self {
            registry,
            shards: ShardManager::new(storage, config.health.clone()),
            fanout: config.fanout.clone(),
        }
    }

    /// Resolve a tenant's shard, failing with `NotFound` for unknown apps
    async fn shard_for(&self, app_id: &str) -> VaultResult<ShardHandle> {
        let registration = self.registry.get(app_id).await?;
        self.shards
            .handle_for(app_id, &registration.health_urls)
            .await
    }

    // ========================================================================
    // Tenant lifecycle
    // ========================================================================

    /// Register a tenant and materialize its shard
    ///
    /// The shard is spawned eagerly so health probes start without waiting
    /// for the first write.
    pub async fn register_tenant(
        &self,
        app_id: &str,
        name: &str,
        health_urls: Vec<String>,
    ) -> VaultResult<TenantRegistration> {
        let registration = self.registry.register(app_id, name, health_urls).await?;
        self.shards
            .handle_for(app_id, &registration.health_urls)
            .await?;
        Ok(registration)
    }

    pub async fn get_tenant(&self, app_id: &str) -> VaultResult<TenantRegistration> {
        self.registry.get(app_id).await
    }

    pub async fn list_tenants(&self) -> VaultResult<Vec<String>> {
        self.registry.list().await
    }

    /// Deregister a tenant and cascade to its shard
    ///
    /// The shard actor is shut down and its database files removed; see
    /// `ShardManager::remove` for the best-effort file cleanup semantics.
    pub async fn delete_tenant(&self, app_id: &str) -> VaultResult<()> {
        self.registry.delete(app_id).await?;
        self.shards.remove(app_id).await;
        Ok(())
    }

    // ========================================================================
    // Single-tenant operations
    // ========================================================================

    pub async fn write_log(&self, app_id: &str, draft: LogDraft) -> VaultResult<LogEntry> {
        self.shard_for(app_id).await?.write_log(draft).await
    }

    pub async fn write_log_batch(
        &self,
        app_id: &str,
        drafts: Vec<LogDraft>,
    ) -> VaultResult<usize> {
        self.shard_for(app_id).await?.write_log_batch(drafts).await
    }

    pub async fn query_logs(&self, app_id: &str, query: LogQuery) -> VaultResult<Vec<LogEntry>> {
        self.shard_for(app_id).await?.query_logs(query).await
    }

    pub async fn query_health(
        &self,
        app_id: &str,
        query: HealthQuery,
    ) -> VaultResult<Vec<HealthCheckResult>> {
        self.shard_for(app_id).await?.query_health(query).await
    }

    pub async fn get_stats(
        &self,
        app_id: &str,
        days: Option<u32>,
    ) -> VaultResult<Vec<DailyStatCounter>> {
        self.shard_for(app_id).await?.get_stats(days).await
    }

    pub async fn prune_logs(&self, app_id: &str, before: Option<String>) -> VaultResult<usize> {
        self.shard_for(app_id).await?.prune_logs(before).await
    }

    pub async fn set_health_urls(&self, app_id: &str, urls: Vec<String>) -> VaultResult<()> {
        self.shard_for(app_id).await?.set_health_urls(urls).await
    }

    /// Trigger an immediate probe cycle for one tenant
    pub async fn check_now(&self, app_id: &str) -> VaultResult<usize> {
        self.shard_for(app_id).await?.check_now().await
    }

    // ========================================================================
    // Cross-tenant fan-out
    // ========================================================================

    /// Query every registered tenant and merge into one time-ordered page
    ///
    /// The caller's filters are applied per tenant with `limit` overridden
    /// to the derived per-app limit and `offset` dropped (offsets are not
    /// meaningful across merged shards). In-flight tenant queries are
    /// capped at the configured fan-out concurrency.
    #[instrument(skip(self, filters))]
    pub async fn query_all_tenants(
        &self,
        filters: &LogQuery,
        global_limit: usize,
    ) -> VaultResult<Vec<AggregatedLogEntry>> {
        let app_ids = self.registry.list().await?;
        if app_ids.is_empty() {
            return Ok(Vec::new());
        }

        let per_tenant_query = LogQuery {
            limit: Some(per_app_limit(global_limit, app_ids.len())),
            offset: None,
            ..filters.clone()
        };

        debug!(
            "fanning out to {} tenants (per-app limit {})",
            app_ids.len(),
            per_tenant_query.limit.unwrap_or_default()
        );

        let queries = app_ids.iter().map(|app_id| {
            let query = per_tenant_query.clone();
            async move {
                let page = timeout(
                    self.fanout.per_tenant_timeout(),
                    self.tenant_page(app_id, query),
                )
                .await;

                match page {
                    Ok(Ok(entries)) => entries
                        .into_iter()
                        .map(|entry| AggregatedLogEntry {
                            app_id: app_id.clone(),
                            entry,
                        })
                        .collect(),
                    Ok(Err(e)) => {
                        warn!("fan-out: {app_id} contributes nothing: {e}");
                        Vec::new()
                    }
                    Err(_) => {
                        warn!("fan-out: {app_id} timed out");
                        Vec::new()
                    }
                }
            }
        });

        let pages: Vec<Vec<AggregatedLogEntry>> = stream::iter(queries)
            .buffer_unordered(self.fanout.max_concurrency.max(1))
            .collect()
            .await;

        let mut merged: Vec<AggregatedLogEntry> = pages.into_iter().flatten().collect();

        // Canonical timestamps compare lexically in chronological order
        merged.sort_by(|a, b| b.entry.timestamp.cmp(&a.entry.timestamp));
        merged.truncate(global_limit);

        Ok(merged)
    }

    async fn tenant_page(&self, app_id: &str, query: LogQuery) -> VaultResult<Vec<LogEntry>> {
        self.shard_for(app_id).await?.query_logs(query).await
    }

    /// Shut down every running shard actor
    pub async fn shutdown_all(&self) {
        self.shards.shutdown_all().await;
    }
}
