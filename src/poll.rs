//! Deadline-bounded polling of a report until it reaches a terminal state.
//!
//! The interval between status checks is constant. Report generation takes
//! minutes, so a fixed 30 second cadence keeps the request count low without
//! backoff. Many clients polling many jobs on the same cadence would benefit
//! from jitter; changing the timing must keep the completed / failed /
//! timed-out outcomes distinct.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::ReportError;
use crate::report::{Report, ReportStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Anything that can look up the current state of a report.
pub trait StatusSource {
    fn fetch_report(&self, report_id: &str) -> Result<Report, ReportError>;
}

impl<S: StatusSource + ?Sized> StatusSource for &S {
    fn fetch_report(&self, report_id: &str) -> Result<Report, ReportError> {
        (**self).fetch_report(report_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Pause between two status checks.
    pub interval: Duration,
    /// Wall-clock ceiling for the whole wait, independent of the number of
    /// checks.
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Caller-side stop signal for [`wait_for_completion`].
///
/// Clones share the same signal. Cancelling wakes a poller that is sleeping
/// between checks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for `duration` or until cancelled. Returns `true` if cancelled.
    fn sleep(&self, duration: Duration) -> bool {
        let guard = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .inner
            .wake
            .wait_timeout_while(guard, duration, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Polls `report_id` until it is `completed` (returned unchanged) or
/// `failed` ([`ReportError::Failed`]).
///
/// Gives up with [`ReportError::Timeout`] once `options.timeout` has elapsed,
/// and with [`ReportError::Cancelled`] as soon as `cancel` fires. Errors from
/// `source` are returned as-is; nothing is retried.
pub fn wait_for_completion<S: StatusSource + ?Sized>(
    source: &S,
    report_id: &str,
    options: &PollOptions,
    cancel: &CancelToken,
) -> Result<Report, ReportError> {
    let start = Instant::now();
    let mut last_status: Option<ReportStatus> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(ReportError::Cancelled {
                report_id: report_id.to_string(),
            });
        }
        if start.elapsed() >= options.timeout {
            tracing::warn!(
                report_id,
                timeout_secs = options.timeout.as_secs(),
                "gave up waiting for report"
            );
            return Err(ReportError::Timeout {
                report_id: report_id.to_string(),
                timeout: options.timeout,
            });
        }

        let report = source.fetch_report(report_id)?;

        if last_status.as_ref() != Some(&report.status) {
            tracing::info!(report_id, status = %report.status, "report status");
            last_status = Some(report.status.clone());
        }

        match report.status {
            ReportStatus::Completed => {
                tracing::info!(
                    report_id,
                    elapsed_secs = start.elapsed().as_secs(),
                    "report completed"
                );
                return Ok(report);
            }
            ReportStatus::Failed => {
                return Err(ReportError::Failed {
                    report_id: report_id.to_string(),
                    error: report.error,
                });
            }
            _ => {}
        }

        let remaining = options.timeout.saturating_sub(start.elapsed());
        if cancel.sleep(options.interval.min(remaining)) {
            return Err(ReportError::Cancelled {
                report_id: report_id.to_string(),
            });
        }
    }
}
