//! Transport port consumed by the report core
//!
//! The core never talks HTTP itself. Authentication, request signing,
//! connection-level retries and rate-limit handling belong to whatever
//! implements [`ReportTransport`]; the core only issues the six calls below and
//! interprets their results.
//!
//! [`RetryingTransport`] is a decorator that adds backoff retries for the
//! idempotent read calls of any transport.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::WireRequestBody;
use crate::types::{DocumentId, ReportId};

mod retrying;

pub use retrying::RetryingTransport;

/// Failure reported by a transport implementation
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection failure, timeout, throttling or a 5xx from the remote
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The remote understood the request and refused it
    #[error("rejected by remote ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the remote
        status: u16,
        /// Message returned by the remote
        message: String,
    },
}

/// Response to a report creation call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedReport {
    /// Remote report id
    pub report_id: String,
    /// Remote status literal
    pub status: String,
    /// When the remote accepted the report
    pub created_at: DateTime<Utc>,
}

/// A report record as returned by the remote
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteReport {
    /// Remote report id
    pub report_id: String,
    /// Report type, when the remote includes it
    #[serde(default)]
    pub report_type: Option<String>,
    /// Remote status literal (`IN_QUEUE`, `IN_PROGRESS`, `DONE`, `CANCELLED`, `FATAL`)
    #[serde(rename = "processingStatus")]
    pub status: String,
    /// When the remote accepted the report
    pub created_at: DateTime<Utc>,
    /// When processing finished
    #[serde(default, rename = "processingEndTime")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Document handle for finished reports
    #[serde(default, rename = "reportDocumentId")]
    pub document_id: Option<String>,
}

/// A document descriptor as returned by the remote
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    /// Document handle
    #[serde(rename = "reportDocumentId")]
    pub document_id: String,
    /// Pre-authorized download URL
    pub url: String,
    /// Compression algorithm, absent for plain documents
    #[serde(default)]
    pub compression_algorithm: Option<String>,
    /// Declared content type
    #[serde(default)]
    pub content_type: Option<String>,
}

/// One page of a report listing
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteReportPage {
    /// Reports on this page
    #[serde(default, rename = "reports")]
    pub items: Vec<RemoteReport>,
    /// Continuation token
    #[serde(default, rename = "nextToken")]
    pub next_page_token: Option<String>,
}

/// Capability performing authenticated calls against the remote reports API
///
/// Implementations must be safe for concurrent use: independent report
/// lifecycles share one transport.
#[async_trait]
pub trait ReportTransport: Send + Sync {
    /// Submit a new report request
    async fn create(&self, body: &WireRequestBody) -> Result<CreatedReport, TransportError>;

    /// Fetch the current record of a report
    async fn get_status(&self, report_id: &ReportId) -> Result<RemoteReport, TransportError>;

    /// Resolve a document handle into a download descriptor
    async fn get_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<RemoteDocument, TransportError>;

    /// Download raw bytes from a pre-authorized URL
    async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>, TransportError>;

    /// List reports matching the given query parameters
    async fn list(&self, query: &[(String, String)]) -> Result<RemoteReportPage, TransportError>;

    /// Ask the remote to cancel a report
    async fn cancel(&self, report_id: &ReportId) -> Result<(), TransportError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: ReportTransport + ?Sized> ReportTransport for std::sync::Arc<T> {
    async fn create(&self, body: &WireRequestBody) -> Result<CreatedReport, TransportError> {
        (**self).create(body).await
    }

    async fn get_status(&self, report_id: &ReportId) -> Result<RemoteReport, TransportError> {
        (**self).get_status(report_id).await
    }

    async fn get_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<RemoteDocument, TransportError> {
        (**self).get_document(document_id).await
    }

    async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        (**self).fetch_raw(url).await
    }

    async fn list(&self, query: &[(String, String)]) -> Result<RemoteReportPage, TransportError> {
        (**self).list(query).await
    }

    async fn cancel(&self, report_id: &ReportId) -> Result<(), TransportError> {
        (**self).cancel(report_id).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
