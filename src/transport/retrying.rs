//! Backoff retries for idempotent transport reads.

use async_trait::async_trait;

use super::{
    CreatedReport, RemoteDocument, RemoteReport, RemoteReportPage, ReportTransport,
    TransportError,
};
use crate::config::RetryConfig;
use crate::request::WireRequestBody;
use crate::retry::with_retry;
use crate::types::{DocumentId, ReportId};

/// Wraps a [`ReportTransport`] and retries transient failures of read calls.
///
/// `get_status`, `get_document`, `fetch_raw` and `list` are retried according
/// to the [`RetryConfig`]. `create` and `cancel` are not idempotent on the
/// remote side and pass straight through.
pub struct RetryingTransport<T> {
    inner: T,
    config: RetryConfig,
}

impl<T: ReportTransport> RetryingTransport<T> {
    /// Wrap `inner` with the given retry policy
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// The wrapped transport
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: ReportTransport> ReportTransport for RetryingTransport<T> {
    async fn create(&self, body: &WireRequestBody) -> Result<CreatedReport, TransportError> {
        self.inner.create(body).await
    }

    async fn get_status(&self, report_id: &ReportId) -> Result<RemoteReport, TransportError> {
        with_retry(&self.config, || self.inner.get_status(report_id)).await
    }

    async fn get_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<RemoteDocument, TransportError> {
        with_retry(&self.config, || self.inner.get_document(document_id)).await
    }

    async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        with_retry(&self.config, || self.inner.fetch_raw(url)).await
    }

    async fn list(&self, query: &[(String, String)]) -> Result<RemoteReportPage, TransportError> {
        with_retry(&self.config, || self.inner.list(query)).await
    }

    async fn cancel(&self, report_id: &ReportId) -> Result<(), TransportError> {
        self.inner.cancel(report_id).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
