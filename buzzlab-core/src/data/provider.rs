//! Trend provider trait, wire types and structured error types.
//!
//! The TrendProvider trait abstracts over the transport to the search-trend
//! API so the retry loop in [`super::fetcher`] can be driven by a scripted
//! provider in tests. A provider performs exactly one HTTP exchange per call
//! and never retries on its own.

use crate::domain::{Entity, QueryWindow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One keyword group in a batch request. The group name is the keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordGroup {
    pub group_name: String,
    pub keywords: Vec<String>,
}

/// Body of a daily search-trend batch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub time_unit: String,
    pub keyword_groups: Vec<KeywordGroup>,
    pub device: String,
    pub gender: String,
    pub ages: Vec<String>,
}

impl SearchRequest {
    /// Daily-resolution request for one chunk, groups in chunk order.
    pub fn daily(window: &QueryWindow, chunk: &[Entity]) -> Self {
        Self {
            start_date: window.start(),
            end_date: window.end(),
            time_unit: "date".to_string(),
            keyword_groups: chunk
                .iter()
                .map(|e| KeywordGroup {
                    group_name: e.display_name.clone(),
                    keywords: vec![e.display_name.clone()],
                })
                .collect(),
            device: String::new(),
            gender: String::new(),
            ages: Vec::new(),
        }
    }
}

/// Successful response body. `results` follows `keywordGroups` order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SeriesResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesResult {
    /// Group name echoed back by the API, when present.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub data: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesPoint {
    pub period: String,
    pub ratio: f64,
}

/// Raw outcome of a single HTTP exchange, before any retry decision.
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: u16,
    /// Parsed `Retry-After` header, if the server sent a usable one.
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Structured error types for fetch operations.
///
/// Every variant is scoped to one chunk; none of them aborts a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (waited {waited_secs:.1}s)")]
    RateLimited { waited_secs: f64 },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("response does not match submitted batch: {0}")]
    ResponseMismatch(String),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether the fetcher may try the same request again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::NetworkUnreachable(_)
                | FetchError::RateLimited { .. }
                | FetchError::Http { .. }
        )
    }
}

/// Trait for search-trend transports.
///
/// Implementations send one request and report whatever came back. Status
/// codes are returned as data; only transport failures are errors.
pub trait TrendProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Perform one HTTP exchange for a batch request.
    fn send(&self, request: &SearchRequest) -> Result<ApiReply, FetchError>;
}

/// Parse a `Retry-After` value given in (possibly fractional) seconds.
///
/// HTTP-date forms and negative or non-finite values are ignored.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}
