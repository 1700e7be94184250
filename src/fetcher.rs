//! Paginated retrieval of usage-detail records from the Consumption API.
//!
//! The provider delivers usage details page by page, each response carrying
//! zero or more records plus an optional `nextLink` continuation URL. The
//! pagination state lives in [`UsagePager`]: the pending URL and the count of
//! records already yielded. Page order is preserved exactly as delivered.
//!
//! Retry behavior, per page:
//! - HTTP 429: honor `Retry-After` when present, otherwise exponential
//!   backoff; bounded by `fetch.rate_limit_retries`.
//! - Connect/timeout/5xx: exponential backoff bounded by
//!   `fetch.transient_retries`.
//! - 401/403: fail immediately, token refresh is the credential provider's
//!   job.
//! - Unparseable body: fail the whole fetch. A truncated page set must never
//!   masquerade as a complete one.
//!
//! Each fetch is a fresh network interaction; callers that need to iterate
//! twice materialize via [`UsagePager::fetch_all`].

use crate::config::FetchConfig;
use crate::error::{Result, UsageError};
use crate::models::{RawUsageRecord, UsagePage};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cooperative cancellation flag, checked between pages (never mid-page).
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Deterministic doubling backoff with a ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let millis = (self.base.as_millis() as u64).saturating_mul(1u64 << exp);
        Duration::from_millis(millis).min(self.max)
    }
}

/// Client for the `Microsoft.Consumption/usageDetails` listing.
#[derive(Debug, Clone)]
pub struct UsageClient {
    http: reqwest::Client,
    config: FetchConfig,
    backoff: Backoff,
}

impl UsageClient {
    pub fn new(config: FetchConfig) -> Self {
        let backoff = Backoff::new(
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
        );
        Self {
            http: reqwest::Client::new(),
            config,
            backoff,
        }
    }

    /// Start a paginated fetch over an inclusive date range. Validates the
    /// query before any request goes out.
    pub fn pager(
        &self,
        subscription_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        credential: &str,
    ) -> Result<UsagePager<'_>> {
        if subscription_id.is_empty() {
            return Err(UsageError::InvalidQuery {
                message: "subscription id must not be empty".to_string(),
            });
        }
        if start > end {
            return Err(UsageError::InvalidQuery {
                message: format!("start date {start} is after end date {end}"),
            });
        }
        if credential.is_empty() {
            return Err(UsageError::InvalidQuery {
                message: "credential must not be empty".to_string(),
            });
        }

        let url = format!(
            "{}/subscriptions/{}/providers/Microsoft.Consumption/usageDetails\
             ?startDate={}&endDate={}&api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            subscription_id,
            start,
            end,
            self.config.api_version,
        );

        Ok(UsagePager {
            client: self,
            credential: credential.to_string(),
            next_url: Some(url),
            page_index: 0,
            records_fetched: 0,
        })
    }
}

/// Pagination state machine over one subscription and date range.
///
/// Single consumer, not restartable. `next_url` holds the pending request;
/// once the provider stops returning a continuation link the pager is done.
pub struct UsagePager<'a> {
    client: &'a UsageClient,
    credential: String,
    next_url: Option<String>,
    page_index: usize,
    records_fetched: usize,
}

impl UsagePager<'_> {
    /// Records yielded so far, for partial-progress reporting.
    pub fn records_fetched(&self) -> usize {
        self.records_fetched
    }

    /// Fetch the next page, retrying that same page on throttling or
    /// transient failures. `Ok(None)` once the provider reports no
    /// continuation.
    pub async fn next_page(&mut self) -> Result<Option<Vec<RawUsageRecord>>> {
        let url = match self.next_url.take() {
            Some(url) => url,
            None => return Ok(None),
        };

        let page = self.get_page(&url).await?;
        self.page_index += 1;
        self.records_fetched += page.value.len();
        self.next_url = page.next_link;

        debug!(
            page = self.page_index,
            records = page.value.len(),
            total = self.records_fetched,
            has_more = self.next_url.is_some(),
            "Fetched usage page"
        );

        Ok(Some(page.value))
    }

    /// Drain every remaining page into one vector, checking `cancel`
    /// between pages. Cancellation reports how many records were already
    /// retrieved rather than discarding progress silently.
    pub async fn fetch_all(&mut self, cancel: &CancelToken) -> Result<Vec<RawUsageRecord>> {
        let mut records = Vec::new();
        loop {
            if cancel.is_cancelled() {
                return Err(UsageError::Cancelled {
                    records_fetched: self.records_fetched,
                });
            }
            match self.next_page().await? {
                Some(mut page) => records.append(&mut page),
                None => break,
            }
        }
        Ok(records)
    }

    async fn get_page(&self, url: &str) -> Result<UsagePage> {
        let cfg = &self.client.config;
        let mut rate_attempts: u32 = 0;
        let mut transient_attempts: u32 = 0;

        loop {
            let response = self
                .client
                .http
                .get(url)
                .bearer_auth(&self.credential)
                .timeout(Duration::from_secs(cfg.request_timeout_secs))
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(err) => {
                    transient_attempts += 1;
                    if transient_attempts > cfg.transient_retries {
                        return Err(UsageError::TransientFetch {
                            attempts: transient_attempts,
                            records_fetched: self.records_fetched,
                            message: err.to_string(),
                        });
                    }
                    let delay = self.client.backoff.delay_for(transient_attempts);
                    warn!(
                        attempt = transient_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient fetch error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let status = response.status();

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(UsageError::Unauthorized {
                    status: status.as_u16(),
                });
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                rate_attempts += 1;
                if rate_attempts > cfg.rate_limit_retries {
                    return Err(UsageError::RateLimitExceeded {
                        attempts: rate_attempts,
                        records_fetched: self.records_fetched,
                    });
                }
                let delay = retry_after(&response)
                    .unwrap_or_else(|| self.client.backoff.delay_for(rate_attempts));
                warn!(
                    attempt = rate_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, retrying the same page"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if status.is_server_error() {
                transient_attempts += 1;
                if transient_attempts > cfg.transient_retries {
                    return Err(UsageError::TransientFetch {
                        attempts: transient_attempts,
                        records_fetched: self.records_fetched,
                        message: format!("server error HTTP {}", status.as_u16()),
                    });
                }
                let delay = self.client.backoff.delay_for(transient_attempts);
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                return Err(UsageError::InvalidQuery {
                    message: format!("provider rejected the request: HTTP {}", status.as_u16()),
                });
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    return Err(UsageError::MalformedResponse {
                        page: self.page_index + 1,
                        message: format!("failed to read response body: {err}"),
                    });
                }
            };

            return parse_page(&body, self.page_index + 1);
        }
    }
}

/// Parse one page body, surfacing provider error envelopes and structural
/// mismatches as fatal errors.
fn parse_page(body: &str, page: usize) -> Result<UsagePage> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|err| UsageError::MalformedResponse {
            page,
            message: format!("invalid JSON: {err}"),
        })?;

    // Some failures arrive inside a 200 body as an error envelope.
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown provider error");
        return Err(UsageError::MalformedResponse {
            page,
            message: format!("provider error envelope: {message}"),
        });
    }

    serde_json::from_value(value).map_err(|err| UsageError::MalformedResponse {
        page,
        message: format!("unexpected page structure: {err}"),
    })
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
