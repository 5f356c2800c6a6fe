//! Report document resolution
//!
//! A finished report carries a document handle. Resolving it is a three-step
//! affair: ask the remote for a descriptor, download the bytes from the
//! descriptor's pre-authorized URL, then undo the declared compression.
//! None of the steps is retried here.

use flate2::read::GzDecoder;
use std::io::Read;

use crate::error::{Error, Result};
use crate::transport::{RemoteDocument, ReportTransport};
use crate::types::{Compression, DocumentDescriptor, DocumentId};

/// Content type assumed when the remote does not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// A downloaded, decompressed report document
#[derive(Clone, Debug, PartialEq)]
pub struct FetchedDocument {
    /// The document handle this payload belongs to
    pub document_id: DocumentId,
    /// Decompressed payload
    pub bytes: Vec<u8>,
    /// Declared content type of the payload
    pub content_type: String,
}

impl DocumentDescriptor {
    /// Build a descriptor from the remote record.
    ///
    /// Fails with [`Error::UnsupportedCompression`] for compression algorithms
    /// other than gzip, before anything is downloaded.
    pub fn from_remote(remote: RemoteDocument) -> Result<Self> {
        let compression = Compression::from_remote(remote.compression_algorithm.as_deref())?;
        let content_type = remote
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        Ok(Self {
            document_id: DocumentId::from(remote.document_id),
            download_url: remote.url,
            compression,
            content_type,
        })
    }
}

/// Resolve, download and decompress a report document.
pub(crate) async fn resolve_document(
    transport: &dyn ReportTransport,
    document_id: &DocumentId,
) -> Result<FetchedDocument> {
    if document_id.as_str().trim().is_empty() {
        return Err(Error::InvalidState(
            "document id must come from a DONE report".to_string(),
        ));
    }

    let remote = transport
        .get_document(document_id)
        .await
        .map_err(|e| Error::remote("get_document", e))?;
    let descriptor = DocumentDescriptor::from_remote(remote)?;

    tracing::debug!(
        document_id = %document_id,
        compression = ?descriptor.compression,
        content_type = %descriptor.content_type,
        "Downloading report document"
    );

    let raw = transport
        .fetch_raw(&descriptor.download_url)
        .await
        .map_err(|e| Error::remote("fetch_raw", e))?;

    let bytes = match descriptor.compression {
        Compression::None => raw,
        Compression::Gzip => gunzip(&raw)?,
    };

    Ok(FetchedDocument {
        document_id: document_id.clone(),
        bytes,
        content_type: descriptor.content_type,
    })
}

/// Decompress a gzip stream held in memory
pub fn gunzip(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::MalformedContent(format!("invalid gzip stream: {e}")))?;
    Ok(out)
}
