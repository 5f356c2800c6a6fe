//! Report request validation and wire serialization
//!
//! [`build_request`] is pure: it checks a [`ReportRequest`], fills in the
//! default scope and renders the body the remote expects. Timestamps are
//! written as RFC 3339 in UTC with a `Z` suffix and only as many fractional
//! digits as needed, so they parse back to the exact same instant.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::{ReportFilter, ReportRequest};

/// Body of a report creation call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRequestBody {
    /// Remote report type
    pub report_type: String,
    /// Canonical start of the data window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_start_time: Option<String>,
    /// Canonical end of the data window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_end_time: Option<String>,
    /// Scope ids, sorted and deduplicated
    pub marketplace_ids: Vec<String>,
    /// Report options, omitted when empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_options: Option<BTreeMap<String, String>>,
}

/// Validate and serialize a report request.
///
/// # Errors
///
/// [`Error::InvalidRequest`] when the kind is blank, the window is inverted,
/// a scope id is blank, or no scope is given and `default_scope_ids` is empty.
pub fn build_request(
    request: &ReportRequest,
    default_scope_ids: &[String],
) -> Result<WireRequestBody> {
    let report_type = request.kind.trim();
    if report_type.is_empty() {
        return Err(Error::invalid_request("kind", "report kind must not be empty"));
    }

    let (data_start_time, data_end_time) = match &request.data_window {
        Some(window) if window.start > window.end => {
            return Err(Error::invalid_request(
                "data_window",
                format!(
                    "data window start {} is after end {}",
                    canonical_timestamp(&window.start),
                    canonical_timestamp(&window.end)
                ),
            ));
        }
        Some(window) => (
            Some(canonical_timestamp(&window.start)),
            Some(canonical_timestamp(&window.end)),
        ),
        None => (None, None),
    };

    let marketplace_ids: Vec<String> = match &request.scope_ids {
        Some(scopes) if !scopes.is_empty() => scopes.iter().cloned().collect(),
        _ => {
            let mut defaults = default_scope_ids.to_vec();
            defaults.sort();
            defaults.dedup();
            defaults
        }
    };
    if marketplace_ids.is_empty() {
        return Err(Error::invalid_request(
            "scope_ids",
            "no scope ids given and no default scope configured",
        ));
    }
    if marketplace_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(Error::invalid_request(
            "scope_ids",
            "scope ids must not be blank",
        ));
    }

    let report_options = if request.extra_options.is_empty() {
        None
    } else {
        Some(request.extra_options.clone())
    };

    Ok(WireRequestBody {
        report_type: report_type.to_string(),
        data_start_time,
        data_end_time,
        marketplace_ids,
        report_options,
    })
}

/// Largest page the remote will return
pub const MAX_PAGE_SIZE: u32 = 100;

/// Serialize listing filters into query parameters.
///
/// When a continuation token is present only `nextToken` and `pageSize` are
/// sent, since the token already encodes the original filters.
///
/// # Errors
///
/// [`Error::InvalidRequest`] when `page_size` is outside `1..=100` or
/// `created_after` is later than `created_before`.
pub fn build_list_query(filter: &ReportFilter) -> Result<Vec<(String, String)>> {
    if filter.page_size == 0 || filter.page_size > MAX_PAGE_SIZE {
        return Err(Error::invalid_request(
            "page_size",
            format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                filter.page_size
            ),
        ));
    }
    if let (Some(after), Some(before)) = (&filter.created_after, &filter.created_before)
        && after > before
    {
        return Err(Error::invalid_request(
            "created_after",
            "created_after must not be later than created_before",
        ));
    }

    let mut query = vec![("pageSize".to_string(), filter.page_size.to_string())];

    if let Some(token) = filter.page_token.as_deref().filter(|t| !t.is_empty()) {
        query.push(("nextToken".to_string(), token.to_string()));
        return Ok(query);
    }

    if let Some(kinds) = filter.kinds.as_ref().filter(|k| !k.is_empty()) {
        query.push(("reportTypes".to_string(), kinds.join(",")));
    }
    if let Some(states) = filter.states.as_ref().filter(|s| !s.is_empty()) {
        let statuses: Vec<&str> = states.iter().map(|s| s.as_remote()).collect();
        query.push(("processingStatuses".to_string(), statuses.join(",")));
    }
    if let Some(after) = &filter.created_after {
        query.push(("createdSince".to_string(), canonical_timestamp(after)));
    }
    if let Some(before) = &filter.created_before {
        query.push(("createdUntil".to_string(), canonical_timestamp(before)));
    }

    Ok(query)
}

/// Render an instant as an absolute RFC 3339 UTC timestamp without precision loss
pub fn canonical_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a timestamp produced by [`canonical_timestamp`] (or any RFC 3339 string)
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            Error::invalid_request("timestamp", format!("invalid timestamp {value:?}: {e}"))
        })
}
