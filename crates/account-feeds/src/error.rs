use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::source::SourceKind;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64 input: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("bundle split into {parts} part(s), expected exactly 2")]
    Structure { parts: usize },
}

/// Failure raised by a [`Transport`](crate::source::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transport error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("no response within {}ms", .deadline.as_millis())]
    Timeout { deadline: Duration },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unexpected HTTP status {status}")]
    Status { status: StatusCode },
    #[error("giving up on {url} after {attempts} attempt(s): {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: Box<RetrievalError>,
    },
}

impl RetrievalError {
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Exhausted { last, .. } => last.is_timeout(),
            _ => false,
        }
    }

    /// Number of attempts made before this error was surfaced.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error("malformed batch from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    pub fn parse(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            url: url.into(),
            source,
        }
    }
}

/// One source that did not produce a usable result during a cycle.
#[derive(Debug)]
pub struct SourceFailure {
    pub url: String,
    pub kind: SourceKind,
    pub error: SourceError,
}

#[derive(Debug, Error)]
#[error("{} of {total} source(s) failed, first: {}", .failures.len(), first_failure(.failures))]
pub struct AggregationError {
    pub total: usize,
    pub failures: Vec<SourceFailure>,
}

fn first_failure(failures: &[SourceFailure]) -> String {
    failures
        .first()
        .map(|f| format!("{} ({})", f.url, f.error))
        .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),
    #[error("region map error: {0}")]
    RegionMap(String),
    #[error("no bundle configured")]
    MissingBundle,
}
