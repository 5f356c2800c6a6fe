//! Core types for bulk-reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::transport::RemoteReport;

/// Opaque identifier of a remote report
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub String);

impl ReportId {
    /// Create a new ReportId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ReportId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ReportId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle of a finished report's document
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Create a new DocumentId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processing state of a remote report
///
/// `Queued` and `Running` are transient. `Done`, `Cancelled` and `Fatal` are
/// terminal: once reached, a handle never leaves them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportState {
    /// Accepted by the remote, not started yet
    Queued,
    /// Being generated
    Running,
    /// Finished; a document is available
    Done,
    /// Cancelled before completion
    Cancelled,
    /// Failed permanently on the remote side
    Fatal,
}

impl ReportState {
    /// All states, in lifecycle order
    pub const ALL: [ReportState; 5] = [
        ReportState::Queued,
        ReportState::Running,
        ReportState::Done,
        ReportState::Cancelled,
        ReportState::Fatal,
    ];

    /// Whether no further transition can occur from this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReportState::Done | ReportState::Cancelled | ReportState::Fatal
        )
    }

    /// Map a remote status literal to a state.
    ///
    /// Total over all inputs: the five known literals map 1:1, anything else
    /// maps to `Fatal` together with a diagnostic so the poller cannot loop on a
    /// status it does not understand. Matching is case-sensitive.
    pub fn from_remote(status: &str) -> (ReportState, Option<String>) {
        match status {
            "IN_QUEUE" => (ReportState::Queued, None),
            "IN_PROGRESS" => (ReportState::Running, None),
            "DONE" => (ReportState::Done, None),
            "CANCELLED" => (ReportState::Cancelled, None),
            "FATAL" => (ReportState::Fatal, None),
            other => (
                ReportState::Fatal,
                Some(format!("unrecognized remote status {other:?}")),
            ),
        }
    }

    /// The remote status literal for this state
    pub fn as_remote(&self) -> &'static str {
        match self {
            ReportState::Queued => "IN_QUEUE",
            ReportState::Running => "IN_PROGRESS",
            ReportState::Done => "DONE",
            ReportState::Cancelled => "CANCELLED",
            ReportState::Fatal => "FATAL",
        }
    }
}

impl std::fmt::Display for ReportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_remote())
    }
}

/// Time range the report data should cover (`start <= end`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWindow {
    /// Inclusive start of the window
    pub start: DateTime<Utc>,
    /// End of the window
    pub end: DateTime<Utc>,
}

/// A report to be requested from the remote
///
/// Immutable once submitted; the orchestrator only borrows it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Remote report type (e.g., "GET_MERCHANT_LISTINGS_ALL_DATA")
    pub kind: String,

    /// Optional time range for the report data
    #[serde(default)]
    pub data_window: Option<DataWindow>,

    /// Marketplace/scope ids; the configured default scope is used when absent
    #[serde(default)]
    pub scope_ids: Option<BTreeSet<String>>,

    /// Report-type specific options passed through verbatim
    #[serde(default)]
    pub extra_options: BTreeMap<String, String>,
}

impl ReportRequest {
    /// Create a request for the given report kind with default scope and no window
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data_window: None,
            scope_ids: None,
            extra_options: BTreeMap::new(),
        }
    }

    /// Restrict the report to a time range
    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.data_window = Some(DataWindow { start, end });
        self
    }

    /// Use explicit scope ids instead of the configured default
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope_ids = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Add a report option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_options.insert(key.into(), value.into());
        self
    }
}

/// Local view of a remote report
///
/// Created on submission and refreshed by polling. `document_id` is present if
/// and only if `status` is [`ReportState::Done`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportHandle {
    /// Remote report id
    pub report_id: ReportId,
    /// Report kind
    pub kind: String,
    /// Last known status
    pub status: ReportState,
    /// When the remote accepted the report
    pub created_at: DateTime<Utc>,
    /// When the remote finished processing, if it has
    pub completed_at: Option<DateTime<Utc>>,
    /// Document handle, only for `Done` reports
    pub document_id: Option<DocumentId>,
    /// Explanation when the status was coerced to `Fatal` locally
    pub diagnostic: Option<String>,
}

impl ReportHandle {
    /// Build a handle from a remote report record.
    ///
    /// `fallback_kind` is used when the record does not name its report type.
    /// A `DONE` record without a document id is coerced to `Fatal`, and a
    /// document id on any other status is dropped.
    pub fn from_remote(remote: RemoteReport, fallback_kind: &str) -> Self {
        let (mut status, mut diagnostic) = ReportState::from_remote(&remote.status);
        let mut document_id = remote
            .document_id
            .filter(|id| !id.trim().is_empty())
            .map(DocumentId::from);

        match (status, document_id.is_some()) {
            (ReportState::Done, false) => {
                status = ReportState::Fatal;
                diagnostic = Some("remote reported DONE without a document id".to_string());
            }
            (ReportState::Done, true) => {}
            (_, true) => document_id = None,
            (_, false) => {}
        }

        if let Some(reason) = &diagnostic {
            tracing::warn!(
                report_id = %remote.report_id,
                remote_status = %remote.status,
                reason = %reason,
                "Coercing report status to FATAL"
            );
        }

        Self {
            report_id: ReportId::from(remote.report_id),
            kind: remote
                .report_type
                .filter(|kind| !kind.is_empty())
                .unwrap_or_else(|| fallback_kind.to_string()),
            status,
            created_at: remote.created_at,
            completed_at: remote.completed_at,
            document_id,
            diagnostic,
        }
    }

    /// Apply a status refresh, keeping terminal handles frozen
    pub(crate) fn refreshed(self, remote: RemoteReport) -> Self {
        if self.status.is_terminal() {
            return self;
        }
        let kind = self.kind.clone();
        Self::from_remote(remote, &kind)
    }
}

/// Compression applied to a report document
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Plain bytes
    #[default]
    None,
    /// gzip stream
    Gzip,
}

impl Compression {
    /// Parse the remote compression algorithm.
    ///
    /// Absent or empty means uncompressed; `GZIP` is recognized in any case;
    /// anything else fails with [`Error::UnsupportedCompression`].
    pub fn from_remote(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") => Ok(Compression::None),
            Some(v) if v.eq_ignore_ascii_case("GZIP") => Ok(Compression::Gzip),
            Some(other) => Err(Error::UnsupportedCompression(other.to_string())),
        }
    }
}

/// Resolved location and format of a report document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// The document handle this descriptor was resolved from
    pub document_id: DocumentId,
    /// Pre-authorized download URL (typically signed and short-lived)
    pub download_url: String,
    /// Compression of the downloaded bytes
    pub compression: Compression,
    /// Declared content type of the decompressed payload
    pub content_type: String,
}

/// Filters for listing reports
///
/// Passed through to the remote; nothing is filtered locally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportFilter {
    /// Only these report kinds
    #[serde(default)]
    pub kinds: Option<Vec<String>>,
    /// Only reports in these states
    #[serde(default)]
    pub states: Option<Vec<ReportState>>,
    /// Only reports created at or after this instant
    #[serde(default)]
    pub created_after: Option<DateTime<Utc>>,
    /// Only reports created before this instant
    #[serde(default)]
    pub created_before: Option<DateTime<Utc>>,
    /// Continuation token from a previous page
    #[serde(default)]
    pub page_token: Option<String>,
    /// Maximum number of items per page (1..=100)
    pub page_size: u32,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            kinds: None,
            states: None,
            created_after: None,
            created_before: None,
            page_token: None,
            page_size: 10,
        }
    }
}

/// One page of listed reports
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportPage {
    /// Reports on this page
    pub items: Vec<ReportHandle>,
    /// Token for the next page, if any
    pub next_page_token: Option<String>,
}

/// Report lifecycle events
///
/// Observational only: nothing in the core depends on anyone receiving them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportEvent {
    /// A report was accepted by the remote
    Submitted {
        /// Remote report id
        report_id: ReportId,
        /// Report kind
        kind: String,
        /// Initial status
        status: ReportState,
    },

    /// A poll observed a different status than before
    StatusChanged {
        /// Remote report id
        report_id: ReportId,
        /// Previous status
        from: ReportState,
        /// New status
        to: ReportState,
    },

    /// Polling stopped on a terminal state
    Terminal {
        /// Remote report id
        report_id: ReportId,
        /// The terminal state
        state: ReportState,
        /// Number of status requests issued
        polls: u32,
    },

    /// A report document was downloaded
    DocumentFetched {
        /// Document handle
        document_id: DocumentId,
        /// Size of the payload after decompression
        size_bytes: u64,
        /// Declared content type
        content_type: String,
    },

    /// A cancel request was sent for a report
    Cancelled {
        /// Remote report id
        report_id: ReportId,
        /// Whether the remote accepted the cancellation
        accepted: bool,
    },
}
