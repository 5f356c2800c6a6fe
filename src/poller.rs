//! Report status polling
//!
//! Polls a report at a fixed cadence until it reaches a terminal state, the
//! deadline passes, or the caller cancels. The interval is fixed; there is no
//! backoff between polls.
//!
//! Each iteration:
//!
//! 1. stop with [`Error::Aborted`] if the cancellation token fired
//! 2. return the handle if its status is terminal
//! 3. stop with [`Error::Timeout`] if the deadline has passed
//! 4. sleep for the poll interval (interrupted by cancellation)
//! 5. fetch the status (interrupted by cancellation)
//!
//! Status requests for one report never overlap. A transport failure ends the
//! wait immediately with [`Error::RemoteUnavailable`].

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::PollingConfig;
use crate::error::{Error, Result};
use crate::transport::ReportTransport;
use crate::types::{ReportEvent, ReportHandle};

/// Per-call polling parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between status requests (default: 5 seconds)
    pub poll_interval: Duration,
    /// Maximum time to wait, measured from the start of the call (default: 300 seconds)
    ///
    /// `Duration::MAX` waits without a deadline.
    pub deadline: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        PollOptions::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollOptions {
    fn from(config: &PollingConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            deadline: config.deadline,
        }
    }
}

/// Poll `handle` until it reaches a terminal state.
///
/// `Cancelled` and `Fatal` are returned as successful results; only a missed
/// deadline, a transport failure or caller cancellation produce an error. The
/// remote report is never touched on timeout or cancellation.
pub(crate) async fn await_completion(
    transport: &dyn ReportTransport,
    mut handle: ReportHandle,
    options: PollOptions,
    cancel: &CancellationToken,
    events: &broadcast::Sender<ReportEvent>,
) -> Result<ReportHandle> {
    let started = Instant::now();
    // A deadline past the end of the clock never fires
    let deadline = started.checked_add(options.deadline);
    let mut polls: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(aborted(&handle, polls));
        }

        if handle.status.is_terminal() {
            tracing::info!(
                report_id = %handle.report_id,
                status = %handle.status,
                polls,
                elapsed_ms = started.elapsed().as_millis(),
                "Report reached terminal state"
            );
            events
                .send(ReportEvent::Terminal {
                    report_id: handle.report_id.clone(),
                    state: handle.status,
                    polls,
                })
                .ok();
            return Ok(handle);
        }

        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            let elapsed = started.elapsed();
            tracing::warn!(
                report_id = %handle.report_id,
                last_status = %handle.status,
                polls,
                elapsed_ms = elapsed.as_millis(),
                "Report did not finish before the deadline"
            );
            return Err(Error::Timeout {
                elapsed,
                last_status: handle.status,
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(aborted(&handle, polls)),
            _ = tokio::time::sleep(options.poll_interval) => {}
        }

        let remote = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(aborted(&handle, polls)),
            result = transport.get_status(&handle.report_id) => {
                result.map_err(|e| Error::remote("get_status", e))?
            }
        };
        polls += 1;

        let previous = handle.status;
        handle = handle.refreshed(remote);

        tracing::debug!(
            report_id = %handle.report_id,
            status = %handle.status,
            poll = polls,
            "Polled report status"
        );

        if handle.status != previous {
            events
                .send(ReportEvent::StatusChanged {
                    report_id: handle.report_id.clone(),
                    from: previous,
                    to: handle.status,
                })
                .ok();
        }
    }
}

fn aborted(handle: &ReportHandle, polls: u32) -> Error {
    tracing::info!(
        report_id = %handle.report_id,
        last_status = %handle.status,
        polls,
        "Stopped waiting for report"
    );
    Error::Aborted {
        report_id: handle.report_id.clone(),
    }
}
