//! Shared HTTP client with retry and exponential backoff.
//!
//! Retried:
//! - Timeouts and connection errors
//! - 5xx server errors, 408 and 429
//!
//! Not retried:
//! - Any other 4xx (bad key, bad request, not found)

use std::future::Future;
use std::time::Duration;

use nearby_core::config::HttpConfig;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::PlacesError;

/// Longest error body kept in `PlacesError::Http`.
const MAX_ERROR_BODY: usize = 300;

/// Seconds to wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Backoff policy for the idempotent GETs every service makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each one after.
    pub base_delay: Duration,
    pub delay_cap: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100), Duration::from_secs(5))
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay: Duration, delay_cap: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            delay_cap,
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Wait before retry `retry` (0 is the first retry).
    pub fn backoff(&self, retry: u32) -> Duration {
        1u32.checked_shl(retry)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.delay_cap, |wait| wait.min(self.delay_cap))
    }
}

/// 5xx, 408 and 429 are worth another try; other statuses are final.
pub fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT
        )
}

fn is_transient(outcome: &Result<Response, reqwest::Error>) -> bool {
    match outcome {
        Ok(response) => is_transient_status(response.status()),
        Err(e) => e.is_timeout() || e.is_connect() || e.status().is_some_and(is_transient_status),
    }
}

/// Run `send` until it settles or the policy runs out of retries.
///
/// The outcome of the last attempt is returned unchanged, so a final 503 or
/// 429 still reaches `check_status`.
pub async fn with_retry<F, Fut>(policy: &RetryConfig, send: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut retry = 0;
    loop {
        let outcome = send().await;
        if retry >= policy.max_retries || !is_transient(&outcome) {
            if retry > 0 {
                tracing::debug!(retries = retry, "request settled");
            }
            return outcome;
        }

        let wait = policy.backoff(retry);
        match &outcome {
            Ok(response) => {
                tracing::warn!(status = %response.status(), retry = retry + 1, ?wait, "transient status")
            }
            Err(e) => tracing::warn!(error = %e, retry = retry + 1, ?wait, "transient failure"),
        }
        tokio::time::sleep(wait).await;
        retry += 1;
    }
}

/// `reqwest::Client` plus the retry policy every service shares.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryConfig,
}

impl HttpClient {
    /// Build a client from the `[http]` config section.
    ///
    /// # Errors
    /// Fails when the TLS backend cannot be initialised.
    pub fn from_config(config: &HttpConfig) -> Result<Self, PlacesError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            retry: RetryConfig {
                max_retries: config.max_retries,
                ..RetryConfig::default()
            },
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn get(&self, url: &str) -> Result<Response, PlacesError> {
        let response = with_retry(&self.retry, || self.client.get(url).send()).await?;
        check_status(response).await
    }

    /// GET `url` and decode a JSON body.
    ///
    /// # Errors
    /// Network failures, non-success statuses and undecodable bodies.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, PlacesError> {
        let response = self.get(url).await?;
        response
            .json()
            .await
            .map_err(|e| PlacesError::Parse(format!("JSON parse error: {}", e)))
    }

    /// GET `url` and return the raw body with its content type.
    ///
    /// # Errors
    /// Network failures and non-success statuses.
    pub async fn get_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>), PlacesError> {
        let response = self.get(url).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), content_type))
    }
}

async fn check_status(response: Response) -> Result<Response, PlacesError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let wait = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok()?.trim().parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(PlacesError::RateLimited(wait));
    }

    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let end = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|&i| message.is_char_boundary(i))
            .unwrap_or(0);
        message.truncate(end);
    }
    Err(PlacesError::Http {
        status: status.as_u16(),
        message,
    })
}
