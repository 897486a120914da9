use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{RetrievalError, TransportError};

/// Per-request options passed down to the transport.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn accept(mime: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static(mime));
        Self { headers }
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Something that can issue a single GET request.
///
/// Dropping the returned future must abort the request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<FetchResponse, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline of a single attempt, body included.
    pub deadline: Duration,
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(5000);
    pub const DEFAULT_RETRIES: u32 = 3;
    pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(1000);

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            deadline: Self::DEFAULT_DEADLINE,
            max_retries: Self::DEFAULT_RETRIES,
            backoff: Self::DEFAULT_BACKOFF,
        }
    }
}

/// Issues requests with a per-attempt deadline and fixed-delay retries.
#[derive(Clone)]
pub struct RetrievalClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RetrievalClient {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub async fn retrieve(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<FetchResponse, RetrievalError> {
        self.retrieve_with_policy(url, options, &self.policy).await
    }

    pub async fn retrieve_with_policy(
        &self,
        url: &str,
        options: &RequestOptions,
        policy: &RetryPolicy,
    ) -> Result<FetchResponse, RetrievalError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let err = match self.attempt(url, options, policy.deadline).await {
                Ok(response) => {
                    debug!(url = %url, attempt, status = %response.status, "Retrieved");
                    return Ok(response);
                }
                Err(err) => err,
            };

            if attempt >= policy.max_attempts() {
                return Err(RetrievalError::Exhausted {
                    url: url.to_owned(),
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            warn!(
                url = %url,
                attempt,
                max = policy.max_retries,
                delay_ms = policy.backoff.as_millis() as u64,
                error = %err,
                "Retrying after failed attempt"
            );
            tokio::time::sleep(policy.backoff).await;
        }
    }

    async fn attempt(
        &self,
        url: &str,
        options: &RequestOptions,
        deadline: Duration,
    ) -> Result<FetchResponse, RetrievalError> {
        let response = tokio::time::timeout(deadline, self.transport.fetch(url, options))
            .await
            .map_err(|_| RetrievalError::Timeout { deadline })??;

        if !response.status.is_success() {
            return Err(RetrievalError::Status {
                status: response.status,
            });
        }
        Ok(response)
    }
}
