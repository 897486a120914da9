//! Retrieval of record batches from remote sources.

mod client;
mod embedded;
mod http;
mod models;
mod structured;

pub use client::{FetchResponse, RequestOptions, RetrievalClient, RetryPolicy, Transport};
pub use embedded::{EmbeddedSource, extract_payload};
pub use http::{DEFAULT_UA, HttpTransport, default_client};
pub use models::{AccountRecord, OK_STATUS, ObservedAt, SourceBatch, VALID_FLAG};
pub use structured::StructuredSource;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Response shape of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Returns a JSON batch directly.
    Structured,
    /// Returns markup with the batch embedded in a script literal.
    Embedded,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Structured => "structured",
            SourceKind::Embedded => "embedded",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation<'a> {
    pub kind: SourceKind,
    pub url: &'a str,
}

impl<'a> SourceLocation<'a> {
    pub fn new(kind: SourceKind, url: &'a str) -> Self {
        Self { kind, url }
    }
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetches one batch from `url`.
    ///
    /// `Ok(None)` means the source carried no batch, which is not an error.
    async fn fetch(&self, url: &str) -> Result<Option<SourceBatch>, SourceError>;
}
