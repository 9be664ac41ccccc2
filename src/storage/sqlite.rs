//! SQLite storage backend, one database file per tenant
//!
//! Each shard owns its own database file, which is what enforces tenant
//! isolation at the storage layer: no query in this module can ever touch
//! another tenant's rows, because another tenant's rows live in a different
//! file.
//!
//! ## Configuration
//!
//! - **WAL mode**: readers don't block the writer
//! - **Connection pooling**: a small pool per shard
//! - **Busy timeout**: retries on lock contention instead of failing fast

use std::path::Path;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthQuery, HealthStatus, LogQuery, TenantStore};
use super::error::{StorageError, StorageResult};
use super::schema::{SCHEMA_STATEMENTS, aggregate_level_counts, zero_filled_stats};
use crate::{DailyStatCounter, HealthCheckResult, LogEntry, LogLevel};

/// SQLite-backed store for a single tenant
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStore {
    /// Open (or create) the tenant's database file
    #[instrument(skip_all)]
    pub async fn open(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        debug!("opening SQLite shard at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> StorageResult<LogEntry> {
        let level_str: String = row.get("level");
        let level = level_str.parse::<LogLevel>().map_err(|e| {
            StorageError::SerializationError(format!("corrupt level column: {e}"))
        })?;

        let context_str: Option<String> = row.get("context");
        let context = context_str
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| {
                    StorageError::SerializationError(format!("corrupt context column: {e}"))
                })
            })
            .transpose()?;

        Ok(LogEntry {
            id: row.get("id"),
            timestamp: row.get("timestamp"),
            level,
            message: row.get("message"),
            context,
            request_id: row.get("request_id"),
        })
    }

    async fn insert_entry_tx(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        entry: &LogEntry,
    ) -> StorageResult<()> {
        let context_json = entry
            .context
            .as_ref()
            .map(|v| {
                serde_json::to_string(v).map_err(|e| {
                    StorageError::SerializationError(format!("failed to serialize context: {e}"))
                })
            })
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO logs (id, timestamp, level, message, context, request_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.timestamp)
        .bind(entry.level.as_str())
        .bind(&entry.message)
        .bind(context_json)
        .bind(&entry.request_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    async fn bump_counter_tx(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        date: &str,
        level: LogLevel,
        by: u64,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stats (date, level, count) VALUES (?, ?, ?)
            ON CONFLICT (date, level) DO UPDATE SET count = count + excluded.count
            "#,
        )
        .bind(date)
        .bind(level.as_str())
        .bind(by as i64)
        .execute(&mut **tx)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl TenantStore for SqliteStore {
    #[instrument(skip(self))]
    async fn init_schema(&self) -> StorageResult<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::SchemaFailed(e.to_string()))?;
        }

        debug!("schema ready at {}", self.db_path);
        Ok(())
    }

    #[instrument(skip(self, entry), fields(id = %entry.id))]
    async fn insert_log(&self, entry: &LogEntry) -> StorageResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Self::insert_entry_tx(&mut tx, entry).await?;

        let day = crate::util::day_of(&entry.timestamp).to_string();
        Self::bump_counter_tx(&mut tx, &day, entry.level, 1).await?;

        tx.commit()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn insert_log_batch(&self, entries: &[LogEntry]) -> StorageResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        for entry in entries {
            Self::insert_entry_tx(&mut tx, entry).await?;
        }

        // One counter upsert per distinct (day, level), not per entry
        for ((day, level), count) in aggregate_level_counts(entries) {
            Self::bump_counter_tx(&mut tx, &day, level, count).await?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        debug!("batch insert complete");
        Ok(())
    }

    #[instrument(skip(self, query))]
    async fn query_logs(&self, query: &LogQuery) -> StorageResult<Vec<LogEntry>> {
        let mut sql = String::from(
            "SELECT id, timestamp, level, message, context, request_id FROM logs",
        );

        let mut clauses = Vec::new();
        if query.level.is_some() {
            clauses.push("level = ?");
        }
        if query.since.is_some() {
            clauses.push("timestamp >= ?");
        }
        if query.until.is_some() {
            clauses.push("timestamp < ?");
        }
        if query.request_id.is_some() {
            clauses.push("request_id = ?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY timestamp DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query(&sql);
        if let Some(level) = query.level {
            q = q.bind(level.as_str());
        }
        if let Some(since) = &query.since {
            q = q.bind(since);
        }
        if let Some(until) = &query.until {
            q = q.bind(until);
        }
        if let Some(request_id) = &query.request_id {
            q = q.bind(request_id);
        }
        q = q
            .bind(query.effective_limit() as i64)
            .bind(query.effective_offset() as i64);

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let entries: StorageResult<Vec<LogEntry>> =
            rows.iter().map(Self::row_to_entry).collect();

        let results = entries?;
        debug!("query returned {} entries", results.len());
        Ok(results)
    }

    #[instrument(skip(self), fields(before = %before))]
    async fn prune_logs(&self, before: &str) -> StorageResult<usize> {
        info!("pruning log entries older than {}", before);

        let result = sqlx::query("DELETE FROM logs WHERE timestamp < ?")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let deleted = result.rows_affected() as usize;
        info!("deleted {} old entries", deleted);

        Ok(deleted)
    }

    #[instrument(skip(self, result), fields(url = %result.url))]
    async fn insert_health_result(&self, result: &HealthCheckResult) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO health_checks (id, url, status, latency_ms, checked_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&result.id)
        .bind(&result.url)
        .bind(result.status.map(|s| s as i64))
        .bind(result.latency_ms.map(|l| l as i64))
        .bind(&result.checked_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self, query))]
    async fn query_health(&self, query: &HealthQuery) -> StorageResult<Vec<HealthCheckResult>> {
        let mut sql =
            String::from("SELECT id, url, status, latency_ms, checked_at FROM health_checks");

        let mut clauses = Vec::new();
        if query.url.is_some() {
            clauses.push("url = ?");
        }
        if query.since.is_some() {
            clauses.push("checked_at >= ?");
        }
        if query.until.is_some() {
            clauses.push("checked_at < ?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY checked_at DESC LIMIT ?");

        let mut q = sqlx::query(&sql);
        if let Some(url) = &query.url {
            q = q.bind(url);
        }
        if let Some(since) = &query.since {
            q = q.bind(since);
        }
        if let Some(until) = &query.until {
            q = q.bind(until);
        }
        q = q.bind(query.effective_limit() as i64);

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let results = rows
            .iter()
            .map(|row| HealthCheckResult {
                id: row.get("id"),
                url: row.get("url"),
                status: row.get::<Option<i64>, _>("status").map(|s| s as u16),
                latency_ms: row.get::<Option<i64>, _>("latency_ms").map(|l| l as u64),
                checked_at: row.get("checked_at"),
            })
            .collect::<Vec<_>>();

        Ok(results)
    }

    #[instrument(skip(self))]
    async fn get_stats(&self, days: u32) -> StorageResult<Vec<DailyStatCounter>> {
        let days = days.max(1);
        let start = Utc::now().date_naive() - Duration::days(days as i64 - 1);
        let start_str = start.format("%Y-%m-%d").to_string();

        let rows = sqlx::query("SELECT date, level, count FROM stats WHERE date >= ?")
            .bind(&start_str)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let counters: StorageResult<Vec<DailyStatCounter>> = rows
            .iter()
            .map(|row| {
                let level_str: String = row.get("level");
                let level = level_str.parse::<LogLevel>().map_err(|e| {
                    StorageError::SerializationError(format!("corrupt level column: {e}"))
                })?;
                Ok(DailyStatCounter {
                    date: row.get("date"),
                    level,
                    count: row.get::<i64, _>("count") as u64,
                })
            })
            .collect();

        Ok(zero_filled_stats(counters?, start, days))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                message: format!("SQLite shard operational ({})", self.db_path),
            }),
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn stats_summary(&self) -> StorageResult<String> {
        let logs: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM logs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let checks: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM health_checks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(format!(
            "SQLite: {} log entries, {} health checks, {:.2} MB on disk",
            logs.0,
            checks.0,
            file_size as f64 / 1_000_000.0
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing SQLite shard {}", self.db_path);
        self.pool.close().await;
        Ok(())
    }
}
