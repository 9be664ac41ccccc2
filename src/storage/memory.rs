//! In-memory store (no persistence)
//!
//! Implements the same contract as the SQLite store against plain vectors.
//! Useful for tests and for running a hub without a data directory; all
//! data is lost on restart.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::debug;

use super::backend::{HealthQuery, HealthStatus, LogQuery, TenantStore};
use super::error::{StorageError, StorageResult};
use super::schema::zero_filled_stats;
use crate::{DailyStatCounter, HealthCheckResult, LogEntry, LogLevel};

#[derive(Default)]
struct MemoryInner {
    logs: Vec<LogEntry>,
    health: Vec<HealthCheckResult>,
    stats: HashMap<(String, LogLevel), u64>,
}

/// Volatile store for a single tenant
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(entry: &LogEntry, query: &LogQuery) -> bool {
        if let Some(level) = query.level {
            if entry.level != level {
                return false;
            }
        }
        if let Some(since) = &query.since {
            if entry.timestamp.as_str() < since.as_str() {
                return false;
            }
        }
        if let Some(until) = &query.until {
            if entry.timestamp.as_str() >= until.as_str() {
                return false;
            }
        }
        if let Some(request_id) = &query.request_id {
            if entry.request_id.as_deref() != Some(request_id.as_str()) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn init_schema(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn insert_log(&self, entry: &LogEntry) -> StorageResult<()> {
        self.insert_log_batch(std::slice::from_ref(entry)).await
    }

    async fn insert_log_batch(&self, entries: &[LogEntry]) -> StorageResult<()> {
        let mut inner = self.inner.write().expect("memory store lock poisoned");

        // All-or-nothing: check id uniqueness before mutating anything
        for entry in entries {
            if inner.logs.iter().any(|e| e.id == entry.id)
                || entries.iter().filter(|e| e.id == entry.id).count() > 1
            {
                return Err(StorageError::QueryFailed(format!(
                    "duplicate log id: {}",
                    entry.id
                )));
            }
        }

        for entry in entries {
            let day = crate::util::day_of(&entry.timestamp).to_string();
            *inner.stats.entry((day, entry.level)).or_insert(0) += 1;
            inner.logs.push(entry.clone());
        }
        Ok(())
    }

    async fn query_logs(&self, query: &LogQuery) -> StorageResult<Vec<LogEntry>> {
        let inner = self.inner.read().expect("memory store lock poisoned");

        let mut matched: Vec<LogEntry> = inner
            .logs
            .iter()
            .filter(|e| Self::matches(e, query))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(matched
            .into_iter()
            .skip(query.effective_offset())
            .take(query.effective_limit())
            .collect())
    }

    async fn prune_logs(&self, before: &str) -> StorageResult<usize> {
        let mut inner = self.inner.write().expect("memory store lock poisoned");

        let original = inner.logs.len();
        inner.logs.retain(|e| e.timestamp.as_str() >= before);
        Ok(original - inner.logs.len())
    }

    async fn insert_health_result(&self, result: &HealthCheckResult) -> StorageResult<()> {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        inner.health.push(result.clone());
        Ok(())
    }

    async fn query_health(&self, query: &HealthQuery) -> StorageResult<Vec<HealthCheckResult>> {
        let inner = self.inner.read().expect("memory store lock poisoned");

        let mut matched: Vec<HealthCheckResult> = inner
            .health
            .iter()
            .filter(|r| {
                query.url.as_deref().is_none_or(|u| r.url == u)
                    && query
                        .since
                        .as_deref()
                        .is_none_or(|s| r.checked_at.as_str() >= s)
                    && query
                        .until
                        .as_deref()
                        .is_none_or(|u| r.checked_at.as_str() < u)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
        matched.truncate(query.effective_limit());

        Ok(matched)
    }

    async fn get_stats(&self, days: u32) -> StorageResult<Vec<DailyStatCounter>> {
        let days = days.max(1);
        let start = Utc::now().date_naive() - Duration::days(days as i64 - 1);
        let start_str = start.format("%Y-%m-%d").to_string();

        let inner = self.inner.read().expect("memory store lock poisoned");
        let rows = inner
            .stats
            .iter()
            .filter(|((date, _), _)| date.as_str() >= start_str.as_str())
            .map(|((date, level), count)| DailyStatCounter {
                date: date.clone(),
                level: *level,
                count: *count,
            })
            .collect();

        Ok(zero_filled_stats(rows, start, days))
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            message: "in-memory shard operational".to_string(),
        })
    }

    async fn stats_summary(&self) -> StorageResult<String> {
        let inner = self.inner.read().expect("memory store lock poisoned");
        Ok(format!(
            "In-Memory: {} log entries, {} health checks",
            inner.logs.len(),
            inner.health.len()
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory shard (no-op)");
        Ok(())
    }
}
