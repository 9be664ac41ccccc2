//! Per-tenant table definitions and stat-counter helpers
//!
//! Every tenant owns three structures: an append-only `logs` table, an
//! append-only `health_checks` table with its own lifecycle (log pruning
//! never touches it), and a `stats` counter table keyed by `(date, level)`.
//!
//! Timestamps are stored as canonical RFC 3339 TEXT. The fixed-width
//! representation makes `ORDER BY timestamp` and range comparisons correct
//! as plain string operations, which is also what allows the fan-out
//! aggregator to merge entries from different shards lexically.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::{DailyStatCounter, LogEntry, LogLevel};

/// Idempotent DDL, executed by every shard on startup
///
/// `IF NOT EXISTS` everywhere keeps repeated schema initialization safe.
pub const SCHEMA_STATEMENTS: [&str; 6] = [
    r#"
    CREATE TABLE IF NOT EXISTS logs (
        id TEXT PRIMARY KEY,
        timestamp TEXT NOT NULL,
        level TEXT NOT NULL,
        message TEXT NOT NULL,
        context TEXT,
        request_id TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs (timestamp DESC)",
    "CREATE INDEX IF NOT EXISTS idx_logs_level ON logs (level)",
    r#"
    CREATE TABLE IF NOT EXISTS health_checks (
        id TEXT PRIMARY KEY,
        url TEXT NOT NULL,
        status INTEGER,
        latency_ms INTEGER,
        checked_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_health_url_checked ON health_checks (url, checked_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS stats (
        date TEXT NOT NULL,
        level TEXT NOT NULL,
        count INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (date, level)
    )
    "#,
];

/// Pre-aggregate counter increments for a batch of entries
///
/// One increment per distinct `(day, level)` pair instead of one per entry,
/// so a batch write issues a bounded number of counter upserts.
pub fn aggregate_level_counts(entries: &[LogEntry]) -> HashMap<(String, LogLevel), u64> {
    let mut counts: HashMap<(String, LogLevel), u64> = HashMap::new();
    for entry in entries {
        let day = crate::util::day_of(&entry.timestamp).to_string();
        *counts.entry((day, entry.level)).or_insert(0) += 1;
    }
    counts
}

/// Expand sparse counter rows into a dense window of `days` days
///
/// Days with no activity get explicit zero rows for every level, so callers
/// always receive `days * 4` counters ordered by date, then level severity.
pub fn zero_filled_stats(
    rows: Vec<DailyStatCounter>,
    start: NaiveDate,
    days: u32,
) -> Vec<DailyStatCounter> {
    let mut by_key: HashMap<(String, LogLevel), u64> = HashMap::new();
    for row in rows {
        by_key.insert((row.date.clone(), row.level), row.count);
    }

    let mut filled = Vec::with_capacity(days as usize * LogLevel::ALL.len());
    for offset in 0..days {
        let date = (start + Duration::days(offset as i64))
            .format("%Y-%m-%d")
            .to_string();
        for level in LogLevel::ALL {
            let count = by_key.get(&(date.clone(), level)).copied().unwrap_or(0);
            filled.push(DailyStatCounter {
                date: date.clone(),
                level,
                count,
            });
        }
    }
    filled
}
