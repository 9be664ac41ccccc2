//! Message types for shard actor communication
//!
//! Every operation on a tenant travels through its shard's mpsc command
//! channel and answers on a oneshot, which is what serializes all mutations
//! and reads for that tenant without explicit locking.

use tokio::sync::oneshot;

use crate::error::VaultError;
use crate::storage::{HealthQuery, LogQuery};
use crate::{DailyStatCounter, HealthCheckResult, LogDraft, LogEntry};

/// Commands that can be sent to a shard actor
#[derive(Debug)]
pub enum ShardCommand {
    /// Validate, persist and count one log entry
    WriteLog {
        draft: LogDraft,
        respond_to: oneshot::Sender<Result<LogEntry, VaultError>>,
    },

    /// Validate and persist a batch all-or-nothing
    WriteLogBatch {
        drafts: Vec<LogDraft>,
        respond_to: oneshot::Sender<Result<usize, VaultError>>,
    },

    /// Fetch log entries matching the filters, newest first
    QueryLogs {
        query: LogQuery,
        respond_to: oneshot::Sender<Result<Vec<LogEntry>, VaultError>>,
    },

    /// Delete entries older than `before`
    ///
    /// `before` is mandatory; `None` is rejected with a validation error
    /// instead of silently pruning nothing (or everything).
    PruneLogs {
        before: Option<String>,
        respond_to: oneshot::Sender<Result<usize, VaultError>>,
    },

    /// Fetch health-check history, newest first
    QueryHealth {
        query: HealthQuery,
        respond_to: oneshot::Sender<Result<Vec<HealthCheckResult>, VaultError>>,
    },

    /// Last `days` days of per-level counters (default 7)
    GetStats {
        days: Option<u32>,
        respond_to: oneshot::Sender<Result<Vec<DailyStatCounter>, VaultError>>,
    },

    /// Replace the probed URL set; an empty set disarms the scheduler
    SetHealthUrls { urls: Vec<String> },

    /// Probe all configured URLs immediately, bypassing the schedule
    ///
    /// Used for testing and manual refresh operations. Responds with the
    /// number of recorded results.
    CheckNow {
        respond_to: oneshot::Sender<Result<usize, VaultError>>,
    },

    /// Gracefully shut down the shard actor
    Shutdown,
}
