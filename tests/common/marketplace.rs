//! In-memory marketplace that implements the transport port
//!
//! Reports are created with sequential ids (`rpt-1`, `rpt-2`, ...). Each report
//! replays its own scripted status sequence, so several lifecycles can run
//! against one instance without interfering. Every call is counted.

use async_trait::async_trait;
use bulk_reports::transport::{CreatedReport, RemoteDocument, RemoteReport, RemoteReportPage};
use bulk_reports::{DocumentId, ReportId, ReportTransport, TransportError, WireRequestBody};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One scripted status response
#[derive(Clone, Debug)]
pub enum Step {
    /// Remote returns this status literal
    Status(&'static str),
    /// Remote returns DONE with this document id
    Done(&'static str),
    /// Transport fails
    Outage,
}

/// Call counters for each transport operation
#[derive(Default)]
pub struct Calls {
    pub create: AtomicUsize,
    pub get_status: AtomicUsize,
    pub get_document: AtomicUsize,
    pub fetch_raw: AtomicUsize,
    pub list: AtomicUsize,
    pub cancel: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Fake remote reports API
#[derive(Default)]
pub struct FakeMarketplace {
    next_id: AtomicUsize,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    last_status: Mutex<HashMap<String, String>>,
    documents: Mutex<HashMap<String, RemoteDocument>>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    created: Mutex<Vec<WireRequestBody>>,
    /// Ids of reports whose status was requested, in request order
    pub status_log: Mutex<Vec<String>>,
    pub calls: Calls,
}

impl FakeMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the status sequence of the report that will be created as `report_id`
    pub fn script(&self, report_id: &str, steps: Vec<Step>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(report_id.to_string(), steps.into());
    }

    /// Serve a document at `https://files.example/{document_id}`
    pub fn serve_document(
        &self,
        document_id: &str,
        compression: Option<&str>,
        content_type: &str,
        payload: Vec<u8>,
    ) {
        let url = format!("https://files.example/{document_id}");
        self.documents.lock().unwrap().insert(
            document_id.to_string(),
            RemoteDocument {
                document_id: document_id.to_string(),
                url: url.clone(),
                compression_algorithm: compression.map(str::to_string),
                content_type: Some(content_type.to_string()),
            },
        );
        self.blobs.lock().unwrap().insert(url, payload);
    }

    pub fn created_bodies(&self) -> Vec<WireRequestBody> {
        self.created.lock().unwrap().clone()
    }

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }
}

#[async_trait]
impl ReportTransport for FakeMarketplace {
    async fn create(&self, body: &WireRequestBody) -> Result<CreatedReport, TransportError> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        self.created.lock().unwrap().push(body.clone());
        let id = format!("rpt-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.last_status
            .lock()
            .unwrap()
            .insert(id.clone(), "IN_QUEUE".to_string());
        Ok(CreatedReport {
            report_id: id,
            status: "IN_QUEUE".to_string(),
            created_at: Self::created_at(),
        })
    }

    async fn get_status(&self, report_id: &ReportId) -> Result<RemoteReport, TransportError> {
        self.calls.get_status.fetch_add(1, Ordering::SeqCst);
        self.status_log
            .lock()
            .unwrap()
            .push(report_id.as_str().to_string());

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(report_id.as_str())
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| TransportError::Unavailable(format!("no script for {report_id}")))?;

        let (status, document_id) = match step {
            Step::Status(status) => (status, None),
            Step::Done(document_id) => ("DONE", Some(document_id.to_string())),
            Step::Outage => {
                return Err(TransportError::Unavailable("503 Service Unavailable".into()));
            }
        };
        self.last_status
            .lock()
            .unwrap()
            .insert(report_id.as_str().to_string(), status.to_string());

        Ok(RemoteReport {
            report_id: report_id.as_str().to_string(),
            report_type: None,
            status: status.to_string(),
            created_at: Self::created_at(),
            completed_at: document_id.as_ref().map(|_| Self::created_at()),
            document_id,
        })
    }

    async fn get_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<RemoteDocument, TransportError> {
        self.calls.get_document.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .unwrap()
            .get(document_id.as_str())
            .cloned()
            .ok_or_else(|| TransportError::Rejected {
                status: 404,
                message: "document not found".into(),
            })
    }

    async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.calls.fetch_raw.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::Rejected {
                status: 403,
                message: "signature expired".into(),
            })
    }

    async fn list(&self, query: &[(String, String)]) -> Result<RemoteReportPage, TransportError> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        let wanted: Option<Vec<String>> = query
            .iter()
            .find(|(key, _)| key == "processingStatuses")
            .map(|(_, value)| value.split(',').map(str::to_string).collect());

        let mut items: Vec<RemoteReport> = self
            .last_status
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, status)| wanted.as_ref().is_none_or(|w| w.contains(status)))
            .map(|(id, status)| RemoteReport {
                report_id: id.clone(),
                report_type: Some("GET_FLAT_FILE_OPEN_LISTINGS_DATA".to_string()),
                status: status.clone(),
                created_at: Self::created_at(),
                completed_at: None,
                document_id: (status == "DONE").then(|| format!("doc-of-{id}")),
            })
            .collect();
        items.sort_by(|a, b| a.report_id.cmp(&b.report_id));

        Ok(RemoteReportPage {
            items,
            next_page_token: None,
        })
    }

    async fn cancel(&self, report_id: &ReportId) -> Result<(), TransportError> {
        self.calls.cancel.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.last_status.lock().unwrap();
        match statuses.get(report_id.as_str()).map(String::as_str) {
            Some("IN_QUEUE" | "IN_PROGRESS") => {
                statuses.insert(report_id.as_str().to_string(), "CANCELLED".to_string());
                Ok(())
            }
            Some(status) => Err(TransportError::Rejected {
                status: 400,
                message: format!("report is already {status}"),
            }),
            None => Err(TransportError::Rejected {
                status: 404,
                message: "report not found".into(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "fake-marketplace"
    }
}
