//! Rate-limited batch fetcher.
//!
//! Executes one batch request per chunk against a [`TrendProvider`] and owns
//! the retry policy:
//! - HTTP 429: wait `Retry-After` if given, else the rate-limit timer; the
//!   rate-limit timer doubles after every 429 either way.
//! - other failures (non-200 status, connect/timeout): wait the error timer,
//!   which doubles independently.
//! - every attempt counts toward `max_retries`.
//! - a fixed pacing delay follows every HTTP 200.

use super::backoff::{RetryPolicy, Sleeper};
use super::collect::{CollectProgress, RunPhase};
use super::provider::{FetchError, SearchRequest, SearchResponse, TrendProvider};
use crate::domain::{Entity, QueryWindow};
use std::time::Duration;
use tracing::{debug, warn};

/// Why the fetcher is waiting before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffReason {
    RateLimited,
    RequestFailed,
}

pub struct Fetcher<'a> {
    provider: &'a dyn TrendProvider,
    policy: RetryPolicy,
    sleeper: &'a dyn Sleeper,
    progress: Option<&'a dyn CollectProgress>,
}

impl<'a> Fetcher<'a> {
    pub fn new(provider: &'a dyn TrendProvider, policy: RetryPolicy, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            provider,
            policy,
            sleeper,
            progress: None,
        }
    }

    /// Report backoff waits to a progress observer.
    pub fn with_progress(mut self, progress: &'a dyn CollectProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch one chunk over one window, retrying per the policy.
    pub fn fetch_batch(
        &self,
        chunk: &[Entity],
        window: &QueryWindow,
    ) -> Result<SearchResponse, FetchError> {
        let request = SearchRequest::daily(window, chunk);
        let max_retries = self.policy.max_retries;

        // Both timers live only for this chunk.
        let mut rate_limit_backoff = self.policy.timer();
        let mut error_backoff = self.policy.timer();
        let mut last_error = None;

        for attempt in 0..=max_retries {
            let is_last = attempt == max_retries;

            let failure = match self.provider.send(&request) {
                Ok(reply) if reply.is_success() => {
                    self.sleeper.sleep(self.policy.pacing);
                    debug!(
                        window = %window,
                        groups = chunk.len(),
                        attempt = attempt + 1,
                        "batch call succeeded"
                    );
                    return serde_json::from_str(&reply.body).map_err(|e| {
                        FetchError::ResponseFormatChanged(format!(
                            "failed to parse response for {window}: {e}"
                        ))
                    });
                }
                Ok(reply) if reply.is_rate_limited() => {
                    let wait = reply.retry_after.unwrap_or(rate_limit_backoff.current());
                    rate_limit_backoff.advance();
                    (
                        FetchError::RateLimited {
                            waited_secs: wait.as_secs_f64(),
                        },
                        wait,
                        BackoffReason::RateLimited,
                    )
                }
                Ok(reply) => {
                    let wait = error_backoff.current();
                    error_backoff.advance();
                    (
                        FetchError::Http {
                            status: reply.status,
                            body: truncate(&reply.body, 200),
                        },
                        wait,
                        BackoffReason::RequestFailed,
                    )
                }
                Err(e) if e.is_transient() => {
                    let wait = error_backoff.current();
                    error_backoff.advance();
                    (e, wait, BackoffReason::RequestFailed)
                }
                Err(e) => return Err(e),
            };

            let (error, wait, reason) = failure;
            if !is_last {
                self.back_off(window, attempt, wait, reason, &error);
            }
            last_error = Some(error);
        }

        Err(FetchError::RetriesExhausted {
            attempts: max_retries + 1,
            last: Box::new(
                last_error.unwrap_or_else(|| FetchError::NetworkUnreachable("no attempt made".into())),
            ),
        })
    }

    fn back_off(
        &self,
        window: &QueryWindow,
        attempt: u32,
        wait: Duration,
        reason: BackoffReason,
        error: &FetchError,
    ) {
        warn!(
            window = %window,
            attempt = attempt + 1,
            max_attempts = self.policy.max_retries + 1,
            wait_secs = wait.as_secs_f64(),
            "{error}; backing off"
        );
        if let Some(progress) = self.progress {
            progress.on_phase(RunPhase::Backoff);
            progress.on_backoff(window, attempt, wait, reason);
        }
        self.sleeper.sleep(wait);
        if let Some(progress) = self.progress {
            progress.on_phase(RunPhase::Fetching);
        }
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
