//! Error types for bulk-reports
//!
//! Every failure surfaced by the core is one of the variants below. Nothing is
//! recovered silently: transport failures, deadlines, remote terminal states and
//! decode problems all reach the caller as a typed [`Error`].
//!
//! The [`ToHttpStatus`] trait lets request handlers that sit in front of the core
//! translate failures into HTTP responses with a stable machine-readable code.

use std::time::Duration;
use thiserror::Error;

use crate::transport::TransportError;
use crate::types::{ReportId, ReportState};

/// Result type alias for bulk-reports operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bulk-reports
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "polling.poll_interval")
        key: Option<String>,
    },

    /// The caller supplied an invalid report request or filter
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Human-readable description of the problem
        message: String,
        /// The offending field (e.g., "data_window")
        field: Option<String>,
    },

    /// A transport call failed
    ///
    /// Transient from the core's point of view; the caller may retry the whole
    /// operation.
    #[error("remote unavailable during {operation}: {source}")]
    RemoteUnavailable {
        /// The transport operation that failed (e.g., "get_status")
        operation: &'static str,
        /// The underlying transport failure
        #[source]
        source: TransportError,
    },

    /// The polling deadline passed before the report reached a terminal state
    ///
    /// The remote report may still be running.
    #[error("report did not finish within {elapsed:?} (last status: {last_status})")]
    Timeout {
        /// Time spent polling before giving up
        elapsed: Duration,
        /// The last status observed from the remote
        last_status: ReportState,
    },

    /// The report ended in `Cancelled` or `Fatal`
    #[error("report {report_id} ended in state {state}")]
    ReportFailed {
        /// The terminal state the report ended in
        state: ReportState,
        /// The report that failed
        report_id: ReportId,
    },

    /// The document declared a compression algorithm we cannot decode
    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// The document content could not be decoded
    #[error("malformed content: {0}")]
    MalformedContent(String),

    /// Caller contract violation (e.g., fetching a document for a report that is not done)
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The caller cancelled the wait; the remote report is left untouched
    #[error("waiting for report {report_id} was aborted")]
    Aborted {
        /// The report that was being awaited
        report_id: ReportId,
    },
}

impl Error {
    /// Shorthand for an [`Error::InvalidRequest`] tied to a specific field
    pub fn invalid_request(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidRequest {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Wrap a transport failure for the named operation
    pub fn remote(operation: &'static str, source: TransportError) -> Self {
        Error::RemoteUnavailable { operation, source }
    }

    pub(crate) fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// This trait maps domain errors to appropriate HTTP status codes.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - never retry
            Error::InvalidRequest { .. } => 400,

            // 409 Conflict - caller asked for something the report's state does not allow
            Error::InvalidState(_) => 409,

            // 422 Unprocessable Entity - the remote finished without a usable result
            Error::ReportFailed { .. } => 422,

            // 500 Internal Server Error
            Error::Config { .. } => 500,

            // 502 Bad Gateway - the remote misbehaved or was unreachable
            Error::RemoteUnavailable { .. } => 502,
            Error::UnsupportedCompression(_) => 502,
            Error::MalformedContent(_) => 502,

            // 503 Service Unavailable - the wait was abandoned
            Error::Aborted { .. } => 503,

            // 504 Gateway Timeout
            Error::Timeout { .. } => 504,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidRequest { .. } => "invalid_request",
            Error::RemoteUnavailable { .. } => "remote_unavailable",
            Error::Timeout { .. } => "timeout",
            Error::ReportFailed { .. } => "report_failed",
            Error::UnsupportedCompression(_) => "unsupported_compression",
            Error::MalformedContent(_) => "malformed_content",
            Error::InvalidState(_) => "invalid_state",
            Error::Aborted { .. } => "aborted",
        }
    }
}
