//! Report workflows
//!
//! [`ReportOrchestrator`] composes the request builder, the status poller, the
//! document resolver and the decoder into the public operations:
//!
//! - [`submit`](ReportOrchestrator::submit) → [`await_completion`](ReportOrchestrator::await_completion)
//!   → [`fetch_document`](ReportOrchestrator::fetch_document) → [`decode`](crate::decode),
//!   or all of it at once via [`run_to_completion`](ReportOrchestrator::run_to_completion)
//! - [`list`](ReportOrchestrator::list) and [`cancel`](ReportOrchestrator::cancel)
//!
//! Each orchestrator owns its transport explicitly; there is no shared client.
//! One orchestrator can drive any number of report lifecycles concurrently
//! since every lifecycle only owns its own [`ReportHandle`].

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::decoder::{DecodedReport, decode};
use crate::document::{FetchedDocument, resolve_document};
use crate::error::{Error, Result};
use crate::poller::{self, PollOptions};
use crate::request::{build_list_query, build_request};
use crate::transport::{RemoteReport, ReportTransport, TransportError};
use crate::types::{
    DocumentId, ReportEvent, ReportFilter, ReportHandle, ReportId, ReportPage, ReportRequest,
    ReportState,
};

/// Entry point for requesting, awaiting, downloading and decoding reports
pub struct ReportOrchestrator {
    transport: Arc<dyn ReportTransport>,
    config: Arc<Config>,
    event_tx: broadcast::Sender<ReportEvent>,
}

impl ReportOrchestrator {
    /// Create an orchestrator over the given transport.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the configuration does not validate.
    pub fn new(transport: Arc<dyn ReportTransport>, config: Config) -> Result<Self> {
        config.validate()?;
        let (event_tx, _rx) = broadcast::channel(config.event_capacity);

        tracing::debug!(
            transport = transport.name(),
            poll_interval_secs = config.polling.poll_interval.as_secs(),
            deadline_secs = config.polling.deadline.as_secs(),
            "Report orchestrator created"
        );

        Ok(Self {
            transport,
            config: Arc::new(config),
            event_tx,
        })
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to report lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<ReportEvent> {
        self.event_tx.subscribe()
    }

    /// Submit a report request.
    ///
    /// Calls the transport exactly once. The returned handle is usually
    /// `Queued` or `Running`; an unrecognized remote status yields a `Fatal`
    /// handle with a diagnostic. A report the remote already reports as `DONE`
    /// comes back as `Running` until a status refresh supplies its document id.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] for an invalid request (nothing is sent), or
    /// [`Error::RemoteUnavailable`] if the transport call fails.
    pub async fn submit(&self, request: &ReportRequest) -> Result<ReportHandle> {
        let body = build_request(request, &self.config.default_scope_ids)?;

        let created = self
            .transport
            .create(&body)
            .await
            .map_err(|e| Error::remote("create", e))?;

        // Creation records never carry a document id, so a report that is
        // already DONE is polled once more to pick it up
        let done_at_create = created.status == ReportState::Done.as_remote();
        let status = if done_at_create {
            ReportState::Running.as_remote().to_string()
        } else {
            created.status
        };

        let mut handle = ReportHandle::from_remote(
            RemoteReport {
                report_id: created.report_id,
                report_type: Some(body.report_type.clone()),
                status,
                created_at: created.created_at,
                completed_at: None,
                document_id: None,
            },
            &body.report_type,
        );
        if done_at_create {
            handle.diagnostic =
                Some("remote reported DONE at creation, awaiting document id".to_string());
        }

        tracing::info!(
            report_id = %handle.report_id,
            kind = %handle.kind,
            status = %handle.status,
            "Report submitted"
        );
        self.event_tx
            .send(ReportEvent::Submitted {
                report_id: handle.report_id.clone(),
                kind: handle.kind.clone(),
                status: handle.status,
            })
            .ok();

        Ok(handle)
    }

    /// Poll a report until it reaches a terminal state.
    ///
    /// See [`poller`](crate::poller) for the exact loop. Cancelling `cancel`
    /// stops polling with [`Error::Aborted`] and leaves the remote report
    /// running.
    pub async fn await_completion(
        &self,
        handle: ReportHandle,
        options: PollOptions,
        cancel: &CancellationToken,
    ) -> Result<ReportHandle> {
        poller::await_completion(
            self.transport.as_ref(),
            handle,
            options,
            cancel,
            &self.event_tx,
        )
        .await
    }

    /// Download and decompress the document behind a document handle.
    ///
    /// The id must come from a `Done` report; a blank id is rejected with
    /// [`Error::InvalidState`]. Prefer [`fetch_document_for`](Self::fetch_document_for)
    /// when the handle is at hand.
    pub async fn fetch_document(&self, document_id: &DocumentId) -> Result<FetchedDocument> {
        let document = resolve_document(self.transport.as_ref(), document_id).await?;

        tracing::info!(
            document_id = %document.document_id,
            size_bytes = document.bytes.len(),
            content_type = %document.content_type,
            "Report document fetched"
        );
        self.event_tx
            .send(ReportEvent::DocumentFetched {
                document_id: document.document_id.clone(),
                size_bytes: document.bytes.len() as u64,
                content_type: document.content_type.clone(),
            })
            .ok();

        Ok(document)
    }

    /// Download the document of a finished report.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if the handle is not `Done`.
    pub async fn fetch_document_for(&self, handle: &ReportHandle) -> Result<FetchedDocument> {
        match (&handle.status, &handle.document_id) {
            (ReportState::Done, Some(document_id)) => self.fetch_document(document_id).await,
            (status, _) => Err(Error::InvalidState(format!(
                "report {} is {status}, documents are only available for DONE reports",
                handle.report_id
            ))),
        }
    }

    /// Submit, wait, download and decode a report using the configured polling options.
    pub async fn run_to_completion(
        &self,
        request: &ReportRequest,
        cancel: &CancellationToken,
    ) -> Result<DecodedReport> {
        let options = PollOptions::from(&self.config.polling);
        self.run_to_completion_with(request, options, cancel).await
    }

    /// Submit, wait, download and decode a report.
    ///
    /// Returns exactly one of a decoded report or a typed error. A `Cancelled`
    /// or `Fatal` report fails with [`Error::ReportFailed`] without touching
    /// the document endpoints. A timeout leaves the remote report running; use
    /// [`cancel`](Self::cancel) explicitly if it should be stopped.
    pub async fn run_to_completion_with(
        &self,
        request: &ReportRequest,
        options: PollOptions,
        cancel: &CancellationToken,
    ) -> Result<DecodedReport> {
        let handle = self.submit(request).await?;
        let handle = self.await_completion(handle, options, cancel).await?;

        if handle.status != ReportState::Done {
            return Err(Error::ReportFailed {
                state: handle.status,
                report_id: handle.report_id,
            });
        }

        let document = self.fetch_document_for(&handle).await?;
        decode(&document.bytes, &document.content_type)
    }

    /// List reports matching `filter`, one page at a time.
    ///
    /// Filtering happens remotely; items are mapped the same way status
    /// refreshes are.
    pub async fn list(&self, filter: &ReportFilter) -> Result<ReportPage> {
        let query = build_list_query(filter)?;

        let page = self
            .transport
            .list(&query)
            .await
            .map_err(|e| Error::remote("list", e))?;

        let fallback_kind = match filter.kinds.as_deref() {
            Some([only]) => only.as_str(),
            _ => "",
        };
        let items: Vec<ReportHandle> = page
            .items
            .into_iter()
            .map(|remote| ReportHandle::from_remote(remote, fallback_kind))
            .collect();

        tracing::debug!(
            items = items.len(),
            has_more = page.next_page_token.is_some(),
            "Listed reports"
        );

        Ok(ReportPage {
            items,
            next_page_token: page.next_page_token.filter(|token| !token.is_empty()),
        })
    }

    /// Ask the remote to cancel a report.
    ///
    /// Returns `Ok(true)` if the remote accepted and `Ok(false)` if it refused,
    /// which is what happens for reports that already finished.
    ///
    /// # Errors
    ///
    /// [`Error::RemoteUnavailable`] if the remote could not be reached at all.
    pub async fn cancel(&self, report_id: &ReportId) -> Result<bool> {
        let accepted = match self.transport.cancel(report_id).await {
            Ok(()) => true,
            Err(TransportError::Rejected { status, message }) => {
                tracing::info!(
                    report_id = %report_id,
                    status,
                    message = %message,
                    "Remote refused to cancel report"
                );
                false
            }
            Err(e @ TransportError::Unavailable(_)) => return Err(Error::remote("cancel", e)),
        };

        self.event_tx
            .send(ReportEvent::Cancelled {
                report_id: report_id.clone(),
                accepted,
            })
            .ok();

        Ok(accepted)
    }
}
