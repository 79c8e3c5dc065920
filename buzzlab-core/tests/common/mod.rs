//! Shared test doubles: scripted and fake trend providers.

#![allow(dead_code)]

use buzzlab_core::data::provider::{ApiReply, FetchError, SearchRequest, TrendProvider};
use chrono::NaiveDate;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn ok(body: &str) -> Result<ApiReply, FetchError> {
    Ok(ApiReply {
        status: 200,
        retry_after: None,
        body: body.to_string(),
    })
}

pub fn status(code: u16) -> Result<ApiReply, FetchError> {
    Ok(ApiReply {
        status: code,
        retry_after: None,
        body: format!("{{\"errorCode\":\"{code}\"}}"),
    })
}

pub fn rate_limited(retry_after_secs: Option<u64>) -> Result<ApiReply, FetchError> {
    Ok(ApiReply {
        status: 429,
        retry_after: retry_after_secs.map(Duration::from_secs),
        body: String::new(),
    })
}

pub fn unreachable() -> Result<ApiReply, FetchError> {
    Err(FetchError::NetworkUnreachable("connection reset".into()))
}

/// Replays a fixed sequence of replies, one per call.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<ApiReply, FetchError>>>,
    calls: Mutex<usize>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<ApiReply, FetchError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl TrendProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn send(&self, _request: &SearchRequest) -> Result<ApiReply, FetchError> {
        *self.calls.lock().unwrap() += 1;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| status(500))
    }
}

/// In-memory search-trend API: answers from a per-keyword series, clipped
/// to the requested window. Batches containing a failing keyword get 500.
#[derive(Default)]
pub struct FakeDataLab {
    series: HashMap<String, Vec<(NaiveDate, f64)>>,
    failing: HashSet<String>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl FakeDataLab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, keyword: &str, points: &[(NaiveDate, f64)]) -> Self {
        self.series.insert(keyword.to_string(), points.to_vec());
        self
    }

    pub fn failing_for(mut self, keyword: &str) -> Self {
        self.failing.insert(keyword.to_string());
        self
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl TrendProvider for FakeDataLab {
    fn name(&self) -> &str {
        "fake_datalab"
    }

    fn send(&self, request: &SearchRequest) -> Result<ApiReply, FetchError> {
        self.requests.lock().unwrap().push(request.clone());

        if request
            .keyword_groups
            .iter()
            .any(|g| self.failing.contains(&g.group_name))
        {
            return status(500);
        }

        let results: Vec<_> = request
            .keyword_groups
            .iter()
            .map(|group| {
                let data: Vec<_> = self
                    .series
                    .get(&group.group_name)
                    .into_iter()
                    .flatten()
                    .filter(|(date, _)| request.start_date <= *date && *date <= request.end_date)
                    .map(|(date, ratio)| json!({ "period": date.to_string(), "ratio": ratio }))
                    .collect();
                json!({ "title": group.group_name, "keywords": group.keywords, "data": data })
            })
            .collect();

        let body = json!({
            "startDate": request.start_date.to_string(),
            "endDate": request.end_date.to_string(),
            "timeUnit": "date",
            "results": results,
        });
        ok(&body.to_string())
    }
}
