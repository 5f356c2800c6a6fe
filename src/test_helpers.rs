//! Shared test helpers: a scripted transport double and record builders.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use flate2::Compression as GzLevel;
use flate2::write::GzEncoder;
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::request::WireRequestBody;
use crate::transport::{
    CreatedReport, RemoteDocument, RemoteReport, RemoteReportPage, ReportTransport,
    TransportError,
};
use crate::types::{DocumentId, ReportHandle, ReportId, ReportState};

/// Snapshot of how often each transport operation was invoked
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct CallCounts {
    pub create: usize,
    pub get_status: usize,
    pub get_document: usize,
    pub fetch_raw: usize,
    pub list: usize,
    pub cancel: usize,
}

#[derive(Default)]
struct Counters {
    create: AtomicUsize,
    get_status: AtomicUsize,
    get_document: AtomicUsize,
    fetch_raw: AtomicUsize,
    list: AtomicUsize,
    cancel: AtomicUsize,
}

/// Transport double that replays scripted responses and counts calls.
pub(crate) struct ScriptedTransport {
    create_result: Mutex<Result<CreatedReport, TransportError>>,
    statuses: Mutex<VecDeque<Result<RemoteReport, TransportError>>>,
    repeating_status: Option<RemoteReport>,
    documents: Mutex<HashMap<String, RemoteDocument>>,
    raw: Mutex<HashMap<String, Vec<u8>>>,
    raw_error: Option<TransportError>,
    pages: Mutex<VecDeque<RemoteReportPage>>,
    cancel_result: Result<(), TransportError>,
    counters: Counters,
    created_bodies: Mutex<Vec<WireRequestBody>>,
    list_queries: Mutex<Vec<Vec<(String, String)>>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            create_result: Mutex::new(Ok(CreatedReport {
                report_id: "r-1".to_string(),
                status: "IN_QUEUE".to_string(),
                created_at: fixed_time(),
            })),
            statuses: Mutex::new(VecDeque::new()),
            repeating_status: None,
            documents: Mutex::new(HashMap::new()),
            raw: Mutex::new(HashMap::new()),
            raw_error: None,
            pages: Mutex::new(VecDeque::new()),
            cancel_result: Ok(()),
            counters: Counters::default(),
            created_bodies: Mutex::new(Vec::new()),
            list_queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_create_status(self, status: &str) -> Self {
        *self.create_result.lock().unwrap() = Ok(CreatedReport {
            report_id: "r-1".to_string(),
            status: status.to_string(),
            created_at: fixed_time(),
        });
        self
    }

    pub(crate) fn with_create_error(self, error: TransportError) -> Self {
        *self.create_result.lock().unwrap() = Err(error);
        self
    }

    /// Status responses, consumed one per `get_status` call
    pub(crate) fn with_statuses(self, statuses: Vec<Result<RemoteReport, TransportError>>) -> Self {
        self.statuses.lock().unwrap().extend(statuses);
        self
    }

    /// Status returned once the scripted sequence is exhausted
    pub(crate) fn with_repeating_status(mut self, status: RemoteReport) -> Self {
        self.repeating_status = Some(status);
        self
    }

    pub(crate) fn with_document(self, document: RemoteDocument) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(document.document_id.clone(), document);
        self
    }

    pub(crate) fn with_raw(self, url: &str, bytes: Vec<u8>) -> Self {
        self.raw.lock().unwrap().insert(url.to_string(), bytes);
        self
    }

    pub(crate) fn with_raw_error(mut self, error: TransportError) -> Self {
        self.raw_error = Some(error);
        self
    }

    pub(crate) fn with_page(self, page: RemoteReportPage) -> Self {
        self.pages.lock().unwrap().push_back(page);
        self
    }

    pub(crate) fn with_cancel_result(mut self, result: Result<(), TransportError>) -> Self {
        self.cancel_result = result;
        self
    }

    pub(crate) fn calls(&self) -> CallCounts {
        CallCounts {
            create: self.counters.create.load(Ordering::SeqCst),
            get_status: self.counters.get_status.load(Ordering::SeqCst),
            get_document: self.counters.get_document.load(Ordering::SeqCst),
            fetch_raw: self.counters.fetch_raw.load(Ordering::SeqCst),
            list: self.counters.list.load(Ordering::SeqCst),
            cancel: self.counters.cancel.load(Ordering::SeqCst),
        }
    }

    pub(crate) fn created_bodies(&self) -> Vec<WireRequestBody> {
        self.created_bodies.lock().unwrap().clone()
    }

    pub(crate) fn list_queries(&self) -> Vec<Vec<(String, String)>> {
        self.list_queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportTransport for ScriptedTransport {
    async fn create(&self, body: &WireRequestBody) -> Result<CreatedReport, TransportError> {
        self.counters.create.fetch_add(1, Ordering::SeqCst);
        self.created_bodies.lock().unwrap().push(body.clone());
        self.create_result.lock().unwrap().clone()
    }

    async fn get_status(&self, _report_id: &ReportId) -> Result<RemoteReport, TransportError> {
        self.counters.get_status.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        match (next, &self.repeating_status) {
            (Some(result), _) => result,
            (None, Some(status)) => Ok(status.clone()),
            (None, None) => Err(TransportError::Unavailable(
                "no more scripted statuses".to_string(),
            )),
        }
    }

    async fn get_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<RemoteDocument, TransportError> {
        self.counters.get_document.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .unwrap()
            .get(document_id.as_str())
            .cloned()
            .ok_or_else(|| TransportError::Rejected {
                status: 404,
                message: format!("document {document_id} not found"),
            })
    }

    async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.counters.fetch_raw.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.raw_error {
            return Err(error.clone());
        }
        self.raw
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::Rejected {
                status: 403,
                message: format!("no payload for {url}"),
            })
    }

    async fn list(&self, query: &[(String, String)]) -> Result<RemoteReportPage, TransportError> {
        self.counters.list.fetch_add(1, Ordering::SeqCst);
        self.list_queries.lock().unwrap().push(query.to_vec());
        Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn cancel(&self, _report_id: &ReportId) -> Result<(), TransportError> {
        self.counters.cancel.fetch_add(1, Ordering::SeqCst);
        self.cancel_result.clone()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub(crate) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub(crate) fn remote_report(id: &str, status: &str, document_id: Option<&str>) -> RemoteReport {
    RemoteReport {
        report_id: id.to_string(),
        report_type: None,
        status: status.to_string(),
        created_at: fixed_time(),
        completed_at: (status == "DONE").then(fixed_time),
        document_id: document_id.map(str::to_string),
    }
}

/// Descriptor whose download URL is `https://download/{id}`
pub(crate) fn remote_document(
    id: &str,
    compression: Option<&str>,
    content_type: Option<&str>,
) -> RemoteDocument {
    RemoteDocument {
        document_id: id.to_string(),
        url: format!("https://download/{id}"),
        compression_algorithm: compression.map(str::to_string),
        content_type: content_type.map(str::to_string),
    }
}

pub(crate) fn queued_handle(id: &str) -> ReportHandle {
    ReportHandle {
        report_id: ReportId::from(id),
        kind: "GET_ORDERS".to_string(),
        status: ReportState::Queued,
        created_at: fixed_time(),
        completed_at: None,
        document_id: None,
        diagnostic: None,
    }
}

pub(crate) fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}
