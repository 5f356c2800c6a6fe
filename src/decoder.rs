//! Content decoding for report documents
//!
//! The declared content type is resolved once into a [`ContentFormat`], and
//! the format decides how the payload is decoded:
//!
//! | Content type                                  | Result                     |
//! |-----------------------------------------------|----------------------------|
//! | `application/json`                            | [`DecodedReport::Json`]    |
//! | `text/csv`                                    | [`DecodedReport::Rows`]    |
//! | `text/tab-separated-values`, `text/tsv`       | [`DecodedReport::Rows`]    |
//! | anything else (XML included)                  | [`DecodedReport::Raw`]     |
//!
//! Tabular decoding never fails: short rows are padded with empty strings and
//! long rows are truncated to the header width.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// One decoded tabular row, keyed by header name
pub type Row = HashMap<String, String>;

/// Payload format derived from a content type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentFormat {
    /// JSON document
    Json,
    /// Delimiter-separated rows with a header line
    Delimited(u8),
    /// Returned unchanged
    Passthrough,
}

impl ContentFormat {
    /// Resolve a content type such as `text/csv; charset=UTF-8`.
    ///
    /// Parameters are ignored and the media type is compared case-insensitively.
    pub fn from_content_type(content_type: &str) -> Self {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            "application/json" => ContentFormat::Json,
            "text/csv" => ContentFormat::Delimited(b','),
            "text/tab-separated-values" | "text/tsv" => ContentFormat::Delimited(b'\t'),
            _ => ContentFormat::Passthrough,
        }
    }
}

/// Structured content of a report document
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedReport {
    /// Parsed JSON value
    Json(serde_json::Value),
    /// Tabular rows in document order
    Rows(Vec<Row>),
    /// Undecoded text for content types we do not interpret
    Raw(String),
}

impl DecodedReport {
    /// Tabular rows, if this is a CSV/TSV report
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            DecodedReport::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// JSON value, if this is a JSON report
    pub fn json(&self) -> Option<&serde_json::Value> {
        match self {
            DecodedReport::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Raw text, if the content type was passed through
    pub fn raw(&self) -> Option<&str> {
        match self {
            DecodedReport::Raw(text) => Some(text),
            _ => None,
        }
    }

    /// Number of rows, JSON array elements, or 1 for any other non-empty payload
    pub fn len(&self) -> usize {
        match self {
            DecodedReport::Rows(rows) => rows.len(),
            DecodedReport::Json(serde_json::Value::Array(items)) => items.len(),
            DecodedReport::Json(serde_json::Value::Null) => 0,
            DecodedReport::Json(_) => 1,
            DecodedReport::Raw(text) => usize::from(!text.is_empty()),
        }
    }

    /// Whether the report carries no data
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode a report payload according to its declared content type.
///
/// # Errors
///
/// [`Error::MalformedContent`] when a JSON payload does not parse. Tabular and
/// passthrough decoding cannot fail.
pub fn decode(bytes: &[u8], content_type: &str) -> Result<DecodedReport> {
    match ContentFormat::from_content_type(content_type) {
        ContentFormat::Json => serde_json::from_slice(bytes)
            .map(DecodedReport::Json)
            .map_err(|e| Error::MalformedContent(format!("invalid JSON: {e}"))),
        ContentFormat::Delimited(delimiter) => {
            let text = String::from_utf8_lossy(bytes);
            Ok(DecodedReport::Rows(decode_delimited(
                &text,
                char::from(delimiter),
            )))
        }
        ContentFormat::Passthrough => Ok(DecodedReport::Raw(
            String::from_utf8_lossy(bytes).into_owned(),
        )),
    }
}

/// Split delimited text into rows keyed by the header line.
fn decode_delimited(text: &str, delimiter: char) -> Vec<Row> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let headers: Vec<String> = match lines.next() {
        Some(header_line) => header_line
            .split(delimiter)
            .map(|name| name.trim().to_string())
            .collect(),
        None => return Vec::new(),
    };

    lines
        .map(|line| {
            let mut values = line.split(delimiter).map(str::trim);
            headers
                .iter()
                .map(|header| {
                    let value = values.next().unwrap_or_default();
                    (header.clone(), value.to_string())
                })
                .collect()
        })
        .collect()
}
