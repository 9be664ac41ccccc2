pub mod actors;
pub mod config;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod storage;
pub mod util;

use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// All levels, in ascending severity (used for zero-filled stats)
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// A persisted log entry, immutable once written
///
/// Timestamps are canonical RFC 3339 UTC strings with millisecond precision,
/// so lexical order equals chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    pub context: Option<serde_json::Value>,
    pub request_id: Option<String>,
}

/// An incoming log entry before validation and normalization
///
/// `id` and `timestamp` are assigned by the shard when absent. `level`
/// arrives as a raw string and is validated against [`LogLevel`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogDraft {
    pub id: Option<String>,
    pub timestamp: Option<String>,
    pub level: String,
    pub message: String,
    pub context: Option<serde_json::Value>,
    pub request_id: Option<String>,
}

impl LogDraft {
    /// Validate the draft and turn it into a persistable [`LogEntry`]
    ///
    /// Fails with a validation error if the level is not a known enum value
    /// or a provided timestamp does not parse as RFC 3339. Provided
    /// timestamps are reformatted to the canonical representation so that
    /// lexical comparisons stay correct.
    pub fn normalize(self) -> Result<LogEntry, VaultError> {
        let level = self
            .level
            .parse::<LogLevel>()
            .map_err(VaultError::Validation)?;

        let timestamp = match self.timestamp {
            Some(raw) => {
                let parsed = util::parse_timestamp(&raw).ok_or_else(|| {
                    VaultError::Validation(format!("unparsable timestamp: {raw}"))
                })?;
                util::format_timestamp(parsed)
            }
            None => util::now_timestamp(),
        };

        let id = self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(LogEntry {
            id,
            timestamp,
            level,
            message: self.message,
            context: self.context,
            request_id: self.request_id,
        })
    }
}

/// Result of one health probe against one configured URL
///
/// `status` is `None` when the probe failed at the transport level
/// (timeout, refused connection, DNS failure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub id: String,
    pub url: String,
    pub status: Option<u16>,
    pub latency_ms: Option<u64>,
    pub checked_at: String,
}

/// Per-day, per-level write counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStatCounter {
    /// Day in `YYYY-MM-DD` form (UTC)
    pub date: String,
    pub level: LogLevel,
    pub count: u64,
}

/// A log entry returned by a cross-tenant query, tagged with its source app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedLogEntry {
    pub app_id: String,
    #[serde(flatten)]
    pub entry: LogEntry,
}

/// Registration metadata for one tenant
///
/// `api_key` is a secret consumed by the (external) auth layer and is never
/// returned by any query surface of this crate's gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRegistration {
    pub app_id: String,
    pub name: String,
    pub api_key: String,
    pub health_urls: Vec<String>,
    pub created_at: String,
}
