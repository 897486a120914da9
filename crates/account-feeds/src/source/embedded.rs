use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::client::{RequestOptions, RetrievalClient};
use super::models::SourceBatch;
use super::{SourceAdapter, SourceKind};
use crate::error::SourceError;

// ad = '<payload>', whitespace around `=` optional, payload free of quotes
static PAYLOAD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ad\s*=\s*'([^']+)'").unwrap());

/// Returns the first embedded payload in `page`, if any.
pub fn extract_payload(page: &str) -> Option<&str> {
    PAYLOAD_REGEX
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Source answering with a page that embeds the batch in a script literal.
#[derive(Clone)]
pub struct EmbeddedSource {
    client: RetrievalClient,
    options: RequestOptions,
}

impl EmbeddedSource {
    pub fn new(client: RetrievalClient) -> Self {
        Self {
            client,
            options: RequestOptions::default(),
        }
    }

    /// `Ok(None)` when the page carries no payload; a payload that does not
    /// parse is an error.
    pub async fn fetch_embedded(&self, url: &str) -> Result<Option<SourceBatch>, SourceError> {
        let page = self.client.retrieve(url, &self.options).await?.text();

        let Some(payload) = extract_payload(&page) else {
            debug!(url = %url, "No embedded payload found");
            return Ok(None);
        };

        let body = serde_json::from_str(payload).map_err(|e| SourceError::parse(url, e))?;
        Ok(Some(SourceBatch::from_value(body)))
    }
}

#[async_trait]
impl SourceAdapter for EmbeddedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Embedded
    }

    async fn fetch(&self, url: &str) -> Result<Option<SourceBatch>, SourceError> {
        self.fetch_embedded(url).await
    }
}
