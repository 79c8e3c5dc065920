//! Naver DataLab search-trend provider.
//!
//! Posts batch requests to the DataLab search API. One call per `send`; the
//! retry policy lives in [`super::fetcher::Fetcher`].

use super::provider::{parse_retry_after, ApiReply, FetchError, SearchRequest, TrendProvider};
use crate::config::Credentials;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://openapi.naver.com/v1/datalab/search";

/// DataLab search-trend provider.
pub struct DataLabProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    credentials: Credentials,
}

impl DataLabProvider {
    pub fn new(
        credentials: Credentials,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            credentials,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TrendProvider for DataLabProvider {
    fn name(&self) -> &str {
        "naver_datalab"
    }

    fn send(&self, request: &SearchRequest) -> Result<ApiReply, FetchError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-Naver-Client-Id", self.credentials.client_id())
            .header("X-Naver-Client-Secret", self.credentials.client_secret())
            .json(request)
            .send()
            .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = resp
            .text()
            .map_err(|e| FetchError::NetworkUnreachable(format!("failed to read body: {e}")))?;

        Ok(ApiReply {
            status,
            retry_after,
            body,
        })
    }
}
