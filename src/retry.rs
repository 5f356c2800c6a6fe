//! Retry logic with exponential backoff
//!
//! The report core itself never retries: a failed transport call reaches the
//! caller as [`Error::RemoteUnavailable`]. This module is what callers (and
//! [`RetryingTransport`](crate::RetryingTransport)) use when they want
//! resilience on top of that.
//!
//! # Example
//!
//! ```no_run
//! use bulk_reports::retry::with_retry;
//! use bulk_reports::{ReportOrchestrator, ReportRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(orchestrator: ReportOrchestrator) -> bulk_reports::Result<()> {
//! let config = bulk_reports::RetryConfig::default();
//! let request = ReportRequest::new("GET_FLAT_FILE_OPEN_LISTINGS_DATA");
//! let cancel = CancellationToken::new();
//! let _report = with_retry(&config, || orchestrator.run_to_completion(&request, &cancel)).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use crate::transport::TransportError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (connection reset, remote busy) should return `true`.
/// Permanent failures (bad request, unsupported content) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for TransportError {
    fn is_retryable(&self) -> bool {
        match self {
            TransportError::Unavailable(_) => true,
            // 429 is throttling, 5xx is the remote having trouble
            TransportError::Rejected { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::RemoteUnavailable { source, .. } => source.is_retryable(),
            Error::Timeout { .. }
            | Error::Config { .. }
            | Error::InvalidRequest { .. }
            | Error::ReportFailed { .. }
            | Error::UnsupportedCompression(_)
            | Error::MalformedContent(_)
            | Error::InvalidState(_)
            | Error::Aborted { .. } => false,
        }
    }
}

/// Run `operation`, retrying retryable failures with exponential backoff.
///
/// The operation runs at most `config.max_attempts + 1` times. Non-retryable
/// errors are returned right away; otherwise the last error is returned once
/// the retries are used up. Delays start at `initial_delay`, grow by
/// `backoff_multiplier` and saturate at `max_delay`.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut retries: u32 = 0;
    let mut delay = config.initial_delay;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    tracing::info!(retries, "Transport call recovered after retrying");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !error.is_retryable() {
            tracing::debug!(error = %error, "Transport call failed permanently");
            return Err(error);
        }
        if retries >= config.max_attempts {
            tracing::error!(
                error = %error,
                retries,
                "Transport call still failing, giving up"
            );
            return Err(error);
        }

        retries += 1;
        let wait = if config.jitter {
            add_jitter(delay)
        } else {
            delay
        };
        tracing::warn!(
            error = %error,
            retry = retries,
            max_retries = config.max_attempts,
            wait_ms = wait.as_millis(),
            "Transport call failed, retrying"
        );

        tokio::time::sleep(wait).await;
        delay = next_delay(delay, config);
    }
}

/// Grow `delay` by the backoff multiplier, saturating at `max_delay`
fn next_delay(delay: Duration, config: &RetryConfig) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
}

/// Spread a delay over `[delay, 2 * delay]` so concurrent callers do not retry in lockstep
fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + factor)).unwrap_or(delay)
}
