//! # bulk-reports
//!
//! Asynchronous bulk-report retrieval for marketplace reporting APIs.
//!
//! Large datasets (inventory, orders, financials) are not returned inline by
//! marketplace APIs. Instead a report is requested, the remote generates it in
//! the background, and once it is done a document handle is exchanged for a
//! (usually gzip-compressed) download. This crate implements that protocol:
//!
//! - **Request building** - validation and wire serialization ([`request`])
//! - **Status polling** - fixed-cadence polling with a deadline and caller
//!   cancellation ([`poller`])
//! - **Document resolution** - descriptor lookup, raw download, decompression
//!   ([`document`])
//! - **Content decoding** - JSON, CSV and TSV into structured rows ([`decoder`])
//! - **Orchestration** - the composed workflows ([`ReportOrchestrator`])
//!
//! HTTP, authentication and rate limiting are not implemented here. They live
//! behind the [`ReportTransport`] trait, which the embedding application
//! provides.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bulk_reports::{Config, ReportOrchestrator, ReportRequest, ReportTransport};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(transport: Arc<dyn ReportTransport>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     default_scope_ids: vec!["ATVPDKIKX0DER".to_string()],
//!     ..Default::default()
//! };
//! let orchestrator = ReportOrchestrator::new(transport, config)?;
//!
//! let request = ReportRequest::new("GET_FLAT_FILE_OPEN_LISTINGS_DATA");
//! let report = orchestrator
//!     .run_to_completion(&request, &CancellationToken::new())
//!     .await?;
//!
//! for row in report.rows().unwrap_or_default() {
//!     println!("{:?}", row);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Content decoding (JSON, CSV, TSV, passthrough)
pub mod decoder;
/// Report document resolution and decompression
pub mod document;
/// Error types
pub mod error;
/// Report workflows composed from the lower-level steps
pub mod orchestrator;
/// Report status polling
pub mod poller;
/// Report request validation and serialization
pub mod request;
/// Retry logic with exponential backoff
pub mod retry;
/// Transport port consumed by the core
pub mod transport;
/// Core types and events
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, PollingConfig, RetryConfig};
pub use decoder::{ContentFormat, DecodedReport, Row, decode};
pub use document::FetchedDocument;
pub use error::{Error, Result, ToHttpStatus};
pub use orchestrator::ReportOrchestrator;
pub use poller::PollOptions;
pub use request::{WireRequestBody, build_request};
pub use transport::{ReportTransport, RetryingTransport, TransportError};
pub use types::{
    Compression, DataWindow, DocumentDescriptor, DocumentId, ReportEvent, ReportFilter,
    ReportHandle, ReportId, ReportPage, ReportRequest, ReportState,
};
