use async_trait::async_trait;

use super::client::{RequestOptions, RetrievalClient};
use super::models::SourceBatch;
use super::{SourceAdapter, SourceKind};
use crate::error::SourceError;

/// Source answering with a JSON batch.
#[derive(Clone)]
pub struct StructuredSource {
    client: RetrievalClient,
    options: RequestOptions,
}

impl StructuredSource {
    pub fn new(client: RetrievalClient) -> Self {
        Self {
            client,
            options: RequestOptions::accept("application/json"),
        }
    }

    /// Fetches and parses the batch verbatim, status checks are left to the caller.
    pub async fn fetch_structured(&self, url: &str) -> Result<SourceBatch, SourceError> {
        let response = self.client.retrieve(url, &self.options).await?;
        let body = response.json().map_err(|e| SourceError::parse(url, e))?;
        Ok(SourceBatch::from_value(body))
    }
}

#[async_trait]
impl SourceAdapter for StructuredSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Structured
    }

    async fn fetch(&self, url: &str) -> Result<Option<SourceBatch>, SourceError> {
        self.fetch_structured(url).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RetrievalError, TransportError};
    use crate::source::{FetchResponse, RetryPolicy, Transport};
    use reqwest::StatusCode;
    use std::sync::{Arc, Mutex};

    struct EchoTransport {
        body: &'static str,
        seen_accept: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Transport for EchoTransport {
        async fn fetch(
            &self,
            _url: &str,
            options: &RequestOptions,
        ) -> Result<FetchResponse, TransportError> {
            *self.seen_accept.lock().unwrap() = options
                .headers
                .get(reqwest::header::ACCEPT)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned);
            Ok(FetchResponse::new(StatusCode::OK, self.body))
        }
    }

    fn source(body: &'static str) -> (StructuredSource, Arc<EchoTransport>) {
        let transport = Arc::new(EchoTransport {
            body,
            seen_accept: Mutex::new(None),
        });
        let client = RetrievalClient::new(transport.clone(), RetryPolicy::default());
        (StructuredSource::new(client), transport)
    }

    #[tokio::test]
    async fn test_fetch_structured_returns_batch_verbatim() {
        let (source, transport) =
            source(r#"{"status":"error","data":[{"username":"u","password":"p","status":1}]}"#);
        let batch = source.fetch_structured("https://example.com/api").await.unwrap();

        assert_eq!(batch.outcome_flag, "error");
        assert_eq!(batch.records.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            transport.seen_accept.lock().unwrap().as_deref(),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let (source, _) = source("<html>oops</html>");
        let err = source.fetch("https://example.com/api").await.unwrap_err();
        assert!(matches!(err, SourceError::Parse { ref url, .. } if url == "https://example.com/api"));
    }

    #[tokio::test]
    async fn test_json_that_is_not_a_batch_is_unusable() {
        let (first, _) = source(r#"[{"status":"ok"}]"#);
        let batch = first.fetch_structured("https://example.com/api").await.unwrap();
        assert!(!batch.is_usable());

        let (source, _) = source(r#"{"status":0,"data":"none"}"#);
        let batch = source.fetch_structured("https://example.com/api").await.unwrap();
        assert_eq!(batch.outcome_flag, 0);
        assert_eq!(batch.records, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrieval_failure_propagates() {
        struct Down;

        #[async_trait]
        impl Transport for Down {
            async fn fetch(
                &self,
                _url: &str,
                _options: &RequestOptions,
            ) -> Result<FetchResponse, TransportError> {
                Ok(FetchResponse::new(StatusCode::BAD_GATEWAY, ""))
            }
        }

        let client = RetrievalClient::new(Arc::new(Down), RetryPolicy::default());
        let err = StructuredSource::new(client)
            .fetch("https://example.com/api")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SourceError::Retrieval(RetrievalError::Exhausted { attempts: 4, .. })
        ));
    }
}
