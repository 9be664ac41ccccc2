//! Shard actor - owns one tenant's storage and health cycle
//!
//! All operations for a tenant serialize through this actor: at most one
//! command (write, query, prune, probe cycle) executes at a time, so writes
//! are applied in receipt order and are immediately visible to subsequent
//! queries on the same shard. Different tenants' actors run as independent
//! tasks and never coordinate.
//!
//! ## Message Flow
//!
//! ```text
//! Gateway ──ShardCommand──▶ ShardActor ──▶ TenantStore (SQLite / memory)
//!                              │
//!                              └── health timer ──▶ probe URLs ──▶ record results
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, instrument, trace, warn};

use super::health::{HealthProber, HealthScheduler, RetryDecision};
use super::messages::ShardCommand;
use crate::config::HealthConfig;
use crate::error::{VaultError, VaultResult};
use crate::storage::error::StorageError;
use crate::storage::{HealthQuery, LogQuery, TenantStore};
use crate::{DailyStatCounter, HealthCheckResult, LogDraft, LogEntry};

/// Default window for stat queries
pub const DEFAULT_STATS_DAYS: u32 = 7;

/// Actor that owns a single tenant's shard
pub struct ShardActor {
    app_id: String,
    store: Arc<dyn TenantStore>,
    command_rx: mpsc::Receiver<ShardCommand>,
    scheduler: HealthScheduler,
    prober: HealthProber,
    health_urls: Vec<String>,
}

impl ShardActor {
    fn new(
        app_id: String,
        store: Arc<dyn TenantStore>,
        command_rx: mpsc::Receiver<ShardCommand>,
        health_urls: Vec<String>,
        health: &HealthConfig,
    ) -> Self {
        Self {
            app_id,
            store,
            command_rx,
            scheduler: HealthScheduler::new(health),
            prober: HealthProber::new(health.probe_timeout()),
            health_urls,
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self), fields(app_id = %self.app_id))]
    pub async fn run(mut self) {
        debug!("starting shard actor");

        if let Err(e) = self.store.init_schema().await {
            // Operations will surface storage errors individually
            error!("schema initialization failed: {e}");
        }

        if !self.health_urls.is_empty() {
            self.scheduler.arm(Instant::now());
        }

        loop {
            let deadline = self.scheduler.deadline();

            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(ShardCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }

                _ = wait_until(deadline), if deadline.is_some() => {
                    self.run_health_cycle().await;
                }
            }
        }

        if let Err(e) = self.store.close().await {
            error!("error closing store: {e}");
        }

        debug!("shard actor stopped");
    }

    async fn handle_command(&mut self, cmd: ShardCommand) {
        match cmd {
            ShardCommand::WriteLog { draft, respond_to } => {
                let _ = respond_to.send(self.write_log(draft).await);
            }

            ShardCommand::WriteLogBatch { drafts, respond_to } => {
                let _ = respond_to.send(self.write_log_batch(drafts).await);
            }

            ShardCommand::QueryLogs { query, respond_to } => {
                let result = self.store.query_logs(&query).await.map_err(Into::into);
                let _ = respond_to.send(result);
            }

            ShardCommand::PruneLogs { before, respond_to } => {
                let _ = respond_to.send(self.prune_logs(before).await);
            }

            ShardCommand::QueryHealth { query, respond_to } => {
                let result = self.store.query_health(&query).await.map_err(Into::into);
                let _ = respond_to.send(result);
            }

            ShardCommand::GetStats { days, respond_to } => {
                let days = days.unwrap_or(DEFAULT_STATS_DAYS);
                let result = self.store.get_stats(days).await.map_err(Into::into);
                let _ = respond_to.send(result);
            }

            ShardCommand::SetHealthUrls { urls } => {
                debug!("health urls updated ({} urls)", urls.len());
                self.health_urls = urls;
                if self.health_urls.is_empty() {
                    self.scheduler.disarm();
                } else {
                    self.scheduler.arm(Instant::now());
                }
            }

            ShardCommand::CheckNow { respond_to } => {
                debug!("received CheckNow command");
                let results = self.execute_probes().await;
                let result = self
                    .record_results(&results)
                    .await
                    .map(|_| results.len())
                    .map_err(Into::into);
                let _ = respond_to.send(result);
            }

            ShardCommand::Shutdown => unreachable!("handled in run loop"),
        }
    }

    async fn write_log(&self, draft: LogDraft) -> VaultResult<LogEntry> {
        let entry = draft.normalize()?;
        self.store.insert_log(&entry).await?;
        Ok(entry)
    }

    async fn write_log_batch(&self, drafts: Vec<LogDraft>) -> VaultResult<usize> {
        // Validate the whole batch before touching storage: one bad entry
        // rejects all of them.
        let entries = drafts
            .into_iter()
            .map(LogDraft::normalize)
            .collect::<Result<Vec<_>, _>>()?;

        self.store.insert_log_batch(&entries).await?;
        Ok(entries.len())
    }

    async fn prune_logs(&self, before: Option<String>) -> VaultResult<usize> {
        let raw = before.ok_or_else(|| {
            VaultError::Validation("prune requires a `before` timestamp".to_string())
        })?;
        let parsed = crate::util::parse_timestamp(&raw)
            .ok_or_else(|| VaultError::Validation(format!("unparsable timestamp: {raw}")))?;

        let cutoff = crate::util::format_timestamp(parsed);
        Ok(self.store.prune_logs(&cutoff).await?)
    }

    /// One full probe cycle, driven by the scheduler's alarm
    async fn run_health_cycle(&mut self) {
        if self.health_urls.is_empty() {
            self.scheduler.disarm();
            return;
        }

        let attempt = if self.scheduler.is_retry() {
            "retrying"
        } else {
            "starting"
        };
        trace!("{attempt} health cycle ({} urls)", self.health_urls.len());
        self.scheduler.begin_cycle();

        let results = self.execute_probes().await;

        match self.record_results(&results).await {
            Ok(()) => {
                trace!("health cycle complete ({} results)", results.len());
                self.scheduler.complete_cycle(Instant::now());
            }
            Err(e) => match self.scheduler.operational_failure(Instant::now()) {
                RetryDecision::Retry { delay } => {
                    warn!("failed to record health cycle: {e}; retrying in {delay:?}");
                }
                RetryDecision::GiveUp => {
                    error!("health cycle abandoned for this period: {e}");
                }
            },
        }
    }

    /// Probe every configured URL; failures become `status = None` rows
    async fn execute_probes(&self) -> Vec<HealthCheckResult> {
        let mut results = Vec::with_capacity(self.health_urls.len());
        for url in &self.health_urls {
            results.push(self.prober.probe(url).await);
        }
        results
    }

    async fn record_results(&self, results: &[HealthCheckResult]) -> Result<(), StorageError> {
        for result in results {
            self.store.insert_health_result(result).await?;
        }
        Ok(())
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Handle for one tenant's shard actor
#[derive(Clone)]
pub struct ShardHandle {
    sender: mpsc::Sender<ShardCommand>,
    app_id: String,
}

impl ShardHandle {
    /// Spawn a new shard actor for `app_id`
    pub fn spawn(
        app_id: String,
        store: Arc<dyn TenantStore>,
        health_urls: Vec<String>,
        health: &HealthConfig,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = ShardActor::new(app_id.clone(), store, cmd_rx, health_urls, health);
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            app_id,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    fn unavailable() -> VaultError {
        VaultError::Storage(StorageError::BackendError(
            "shard actor unavailable".to_string(),
        ))
    }

    pub async fn write_log(&self, draft: LogDraft) -> VaultResult<LogEntry> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ShardCommand::WriteLog {
                draft,
                respond_to: tx,
            })
            .await
            .map_err(|_| Self::unavailable())?;

        rx.await.map_err(|_| Self::unavailable())?
    }

    pub async fn write_log_batch(&self, drafts: Vec<LogDraft>) -> VaultResult<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ShardCommand::WriteLogBatch {
                drafts,
                respond_to: tx,
            })
            .await
            .map_err(|_| Self::unavailable())?;

        rx.await.map_err(|_| Self::unavailable())?
    }

    pub async fn query_logs(&self, query: LogQuery) -> VaultResult<Vec<LogEntry>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ShardCommand::QueryLogs {
                query,
                respond_to: tx,
            })
            .await
            .map_err(|_| Self::unavailable())?;

        rx.await.map_err(|_| Self::unavailable())?
    }

    pub async fn prune_logs(&self, before: Option<String>) -> VaultResult<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ShardCommand::PruneLogs {
                before,
                respond_to: tx,
            })
            .await
            .map_err(|_| Self::unavailable())?;

        rx.await.map_err(|_| Self::unavailable())?
    }

    pub async fn query_health(&self, query: HealthQuery) -> VaultResult<Vec<HealthCheckResult>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ShardCommand::QueryHealth {
                query,
                respond_to: tx,
            })
            .await
            .map_err(|_| Self::unavailable())?;

        rx.await.map_err(|_| Self::unavailable())?
    }

    pub async fn get_stats(&self, days: Option<u32>) -> VaultResult<Vec<DailyStatCounter>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ShardCommand::GetStats {
                days,
                respond_to: tx,
            })
            .await
            .map_err(|_| Self::unavailable())?;

        rx.await.map_err(|_| Self::unavailable())?
    }

    pub async fn set_health_urls(&self, urls: Vec<String>) -> VaultResult<()> {
        self.sender
            .send(ShardCommand::SetHealthUrls { urls })
            .await
            .map_err(|_| Self::unavailable())
    }

    /// Trigger an immediate probe cycle
    pub async fn check_now(&self) -> VaultResult<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ShardCommand::CheckNow { respond_to: tx })
            .await
            .map_err(|_| Self::unavailable())?;

        rx.await.map_err(|_| Self::unavailable())?
    }

    /// Shut down the shard actor
    pub async fn shutdown(&self) {
        let _ = self.sender.send(ShardCommand::Shutdown).await;
    }
}
