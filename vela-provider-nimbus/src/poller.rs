//! Poller - drive an order's status to a terminal state
//!
//! Repeatedly fetches order status on a fixed cadence until the status
//! carries a target label or the deadline passes. A status outside the
//! pending/target vocabulary aborts the order immediately; the backend's
//! state machine is not guessed past what it advertises.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};

use crate::api::ApiError;
use crate::order::{Order, ProgressStatus};

/// Default overall deadline for one order
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);
/// Default wait before the first status request
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(10);
/// Default steady-state cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Floor applied to caller-supplied timeouts
pub const DEFAULT_MIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Timing knobs for one polling run
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Overall wall-clock deadline requested by the caller
    pub timeout: Duration,
    /// Wait before the first status request
    pub initial_delay: Duration,
    /// Steady-state cadence between status requests
    pub poll_interval: Duration,
    /// Floor applied even if the caller requested a shorter timeout
    pub min_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            initial_delay: DEFAULT_INITIAL_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            min_timeout: DEFAULT_MIN_TIMEOUT,
        }
    }
}

impl PollConfig {
    /// Default cadence with a caller-supplied overall timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Deadline actually enforced
    pub fn deadline(&self) -> Duration {
        self.timeout.max(self.min_timeout)
    }
}

/// Errors from one polling run
#[derive(Debug, Error)]
pub enum PollError {
    /// The deadline passed while the order was still pending. The
    /// backend-side work may still be running; only local polling stops.
    #[error("order still pending after {waited:?} (last progress rate: {last_rate:?})")]
    Timeout {
        waited: Duration,
        last_rate: Option<i64>,
    },

    /// The order reported a label outside the configured vocabulary
    #[error("order reported status {label:?} outside the known vocabulary (code {raw_code:?})")]
    UnexpectedStatus { label: String, raw_code: String },

    /// The status request itself failed
    #[error("status request failed: {0}")]
    Refresh(#[from] ApiError),
}

/// Pending/target state machine over one order's status stream
pub struct Poller {
    pending: Vec<String>,
    target: Vec<String>,
    config: PollConfig,
}

impl Poller {
    pub fn new(pending: &[&str], target: &[&str]) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            config: PollConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PollConfig) -> Self {
        self.config = config;
        self
    }

    fn is_target(&self, label: &str) -> bool {
        self.target.iter().any(|t| t == label)
    }

    fn is_pending(&self, label: &str) -> bool {
        self.pending.iter().any(|p| p == label)
    }

    /// Poll `refresh` until a target status or the deadline
    ///
    /// Waits the initial delay, then invokes `refresh` at the configured
    /// interval. A timed-out order is abandoned locally; no cancellation
    /// reaches the backend.
    pub async fn wait<F, Fut>(
        &self,
        order: &Order,
        mut refresh: F,
    ) -> Result<ProgressStatus, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ProgressStatus, ApiError>>,
    {
        let deadline = self.config.deadline();
        let started = Instant::now();
        let mut last_rate = None;

        sleep(self.config.initial_delay).await;

        loop {
            let status = refresh().await?;
            last_rate = Some(status.progress_rate);

            if self.is_target(status.label()) {
                log::debug!(
                    "order {} completed at progress rate {}",
                    order.id,
                    status.progress_rate
                );
                return Ok(status);
            }
            if !self.is_pending(status.label()) {
                return Err(PollError::UnexpectedStatus {
                    label: status.label().to_string(),
                    raw_code: status.raw_code,
                });
            }

            log::debug!(
                "order {} still pending at progress rate {}",
                order.id,
                status.progress_rate
            );

            if started.elapsed() >= deadline {
                return Err(PollError::Timeout {
                    waited: started.elapsed(),
                    last_rate,
                });
            }
            sleep(self.config.poll_interval).await;
        }
    }
}
