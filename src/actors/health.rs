//! Health-check scheduling and probing
//!
//! Each shard actor owns one [`HealthScheduler`], a timer-driven state
//! machine, and one [`HealthProber`] wrapping a reqwest client.
//!
//! The failure model is two-level:
//!
//! - An individual URL probe failing is *data*: it is recorded as a
//!   [`HealthCheckResult`] with `status = None`, never as an error.
//! - Failing to record a completed cycle is *operational*: the scheduler
//!   enters `Backoff` and the cycle is retried with increasing delay, up to
//!   a bounded retry count, after which it is abandoned for this period and
//!   the next regular interval is armed.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{trace, warn};

use crate::HealthCheckResult;
use crate::config::HealthConfig;
use crate::util;

/// Where the scheduler currently is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No probes configured; the timer is disarmed
    Idle,

    /// Waiting for the next regular cycle
    Scheduled { at: Instant },

    /// A cycle is currently running
    Executing,

    /// A cycle failed operationally and is waiting to be retried
    Backoff { at: Instant },
}

/// What to do after an operational failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the cycle after the returned delay
    Retry { delay: Duration },

    /// Retries exhausted; the cycle is abandoned until the next interval
    GiveUp,
}

/// Timer state machine for one shard's health cycle
#[derive(Debug)]
pub struct HealthScheduler {
    state: SchedulerState,
    retry_count: u32,
    interval: Duration,
    backoff_base: Duration,
    max_retries: u32,
}

impl HealthScheduler {
    pub fn new(config: &HealthConfig) -> Self {
        Self {
            state: SchedulerState::Idle,
            retry_count: 0,
            interval: config.interval(),
            backoff_base: config.backoff_base(),
            max_retries: config.max_retries,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Is the current attempt a retry of a failed cycle?
    pub fn is_retry(&self) -> bool {
        self.retry_count > 0
    }

    /// Arm the next regular cycle
    pub fn arm(&mut self, now: Instant) {
        self.retry_count = 0;
        self.state = SchedulerState::Scheduled {
            at: now + self.interval,
        };
    }

    /// Disarm the timer (no URLs configured)
    pub fn disarm(&mut self) {
        self.retry_count = 0;
        self.state = SchedulerState::Idle;
    }

    /// When the shard actor should wake up next, if at all
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Scheduled { at } | SchedulerState::Backoff { at } => Some(at),
            SchedulerState::Idle | SchedulerState::Executing => None,
        }
    }

    /// The alarm fired: a cycle starts executing
    pub fn begin_cycle(&mut self) {
        self.state = SchedulerState::Executing;
    }

    /// The cycle's results were recorded; arm the next regular interval
    pub fn complete_cycle(&mut self, now: Instant) {
        self.arm(now);
    }

    /// Recording the cycle failed; back off or give up
    pub fn operational_failure(&mut self, now: Instant) -> RetryDecision {
        self.retry_count += 1;

        if self.retry_count > self.max_retries {
            self.arm(now);
            return RetryDecision::GiveUp;
        }

        let delay = self.backoff_base * 2u32.pow(self.retry_count - 1);
        self.state = SchedulerState::Backoff { at: now + delay };
        RetryDecision::Retry { delay }
    }
}

/// HTTP prober shared by a shard's health cycles
///
/// Every probe produces a result row: an HTTP response of any status code
/// yields `status = Some(code)`, while timeouts and transport errors yield
/// `status = None` with no latency.
pub struct HealthProber {
    client: reqwest::Client,
}

impl HealthProber {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    pub async fn probe(&self, url: &str) -> HealthCheckResult {
        trace!("probing {url}");
        let started = Instant::now();

        match self.client.get(url).send().await {
            Ok(response) => HealthCheckResult {
                id: uuid::Uuid::new_v4().to_string(),
                url: url.to_string(),
                status: Some(response.status().as_u16()),
                latency_ms: Some(started.elapsed().as_millis() as u64),
                checked_at: util::now_timestamp(),
            },
            Err(e) => {
                warn!("probe of {url} failed: {e}");
                HealthCheckResult {
                    id: uuid::Uuid::new_v4().to_string(),
                    url: url.to_string(),
                    status: None,
                    latency_ms: None,
                    checked_at: util::now_timestamp(),
                }
            }
        }
    }
}
