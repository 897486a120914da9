//! Shared account feeds.
//!
//! Source locations ship as an obfuscated bundle. [`bundle`] recovers them,
//! [`source`] fetches batches from structured and embedded sources with a
//! bounded retry client, and [`aggregate`] merges everything into one list of
//! currently valid records. [`cycle::run_cycle`] wires it to a renderer.

pub mod aggregate;
pub mod bundle;
pub mod config;
pub mod cycle;
pub mod error;
pub mod render;
pub mod source;

pub use aggregate::{Aggregation, AggregationPipeline, FailurePolicy};
pub use bundle::SourceLocations;
pub use config::FeedConfig;
pub use cycle::{CycleDeps, CycleReport, run_cycle};
pub use error::FeedError;
pub use source::{AccountRecord, SourceBatch, SourceKind};
