//! Storage contract for one tenant's shard
//!
//! This module defines the `TenantStore` trait that all per-tenant storage
//! implementations must implement. One store instance owns exactly one
//! tenant's data; cross-tenant access happens only by fanning out over
//! multiple stores at the gateway layer.

use async_trait::async_trait;

use super::error::StorageResult;
use crate::{DailyStatCounter, HealthCheckResult, LogEntry};

/// Default page size for log and health queries
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Hard cap on a single query's page size
pub const MAX_QUERY_LIMIT: usize = 1000;

/// Filters for a log query
///
/// Absent filters are no-ops; no combination is invalid. `since` is
/// inclusive, `until` exclusive. Both compare lexically against the
/// canonical timestamp representation.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub level: Option<crate::LogLevel>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub request_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl LogQuery {
    /// Requested limit, defaulted and capped
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_QUERY_LIMIT).min(MAX_QUERY_LIMIT)
    }

    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// Filters for a health-check history query
#[derive(Debug, Clone, Default)]
pub struct HealthQuery {
    pub url: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub limit: Option<usize>,
}

impl HealthQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_QUERY_LIMIT).min(MAX_QUERY_LIMIT)
    }
}

/// Health status of a storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,
}

/// Trait for one tenant's storage backend
///
/// Implementations must be `Send + Sync`; they are driven from a single
/// shard actor task, so they never see concurrent mutations for the same
/// tenant, but handles may be shared for diagnostics.
///
/// ## Atomicity
///
/// `insert_log` and `insert_log_batch` persist the entries *and* their
/// matching daily stat counter increments in one logical step: the caller
/// observes success only once both are durable, and a failure leaves
/// neither applied.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Create tables and indexes; safe to call repeatedly
    async fn init_schema(&self) -> StorageResult<()>;

    /// Persist one entry and increment its daily stat counter
    async fn insert_log(&self, entry: &LogEntry) -> StorageResult<()>;

    /// Persist a batch all-or-nothing, with pre-aggregated counter upserts
    async fn insert_log_batch(&self, entries: &[LogEntry]) -> StorageResult<()>;

    /// Fetch entries matching the filters, newest first
    async fn query_logs(&self, query: &LogQuery) -> StorageResult<Vec<LogEntry>>;

    /// Delete all entries with `timestamp < before`; returns the count
    ///
    /// Health-check rows have a separate lifecycle and are never touched.
    async fn prune_logs(&self, before: &str) -> StorageResult<usize>;

    /// Append one health probe result
    async fn insert_health_result(&self, result: &HealthCheckResult) -> StorageResult<()>;

    /// Fetch health history matching the filters, newest first
    async fn query_health(&self, query: &HealthQuery) -> StorageResult<Vec<HealthCheckResult>>;

    /// Last `days` days of counters, zero-filled per level
    async fn get_stats(&self, days: u32) -> StorageResult<Vec<DailyStatCounter>>;

    /// Lightweight operational check of the backend
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Human-readable backend statistics
    async fn stats_summary(&self) -> StorageResult<String>;

    /// Release resources; pending work is flushed before returning
    async fn close(&self) -> StorageResult<()>;
}
