//! Concurrent fan-out over all sources and merge of their batches.
//!
//! Every source is polled on the calling task, so the fan-out overlaps I/O
//! without spawning. Results are merged in location order once all sources
//! have finished, never in completion order.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bundle::SourceLocations;
use crate::error::{AggregationError, SourceError, SourceFailure};
use crate::source::{
    AccountRecord, EmbeddedSource, RetrievalClient, SourceAdapter, SourceBatch, SourceKind,
    SourceLocation, StructuredSource,
};

/// What to do with the cycle when some sources fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any failing source discards the whole cycle.
    #[default]
    AllOrNothing,
    /// Failing sources are reported and skipped.
    Isolate,
}

#[derive(Debug, Default)]
pub struct Aggregation {
    /// Valid records in group, source and batch order.
    pub records: Vec<AccountRecord>,
    /// Sources skipped under [`FailurePolicy::Isolate`].
    pub failures: Vec<SourceFailure>,
}

pub struct AggregationPipeline {
    structured: Box<dyn SourceAdapter>,
    embedded: Box<dyn SourceAdapter>,
    policy: FailurePolicy,
}

impl AggregationPipeline {
    pub fn new(client: RetrievalClient, policy: FailurePolicy) -> Self {
        Self::with_adapters(
            Box::new(StructuredSource::new(client.clone())),
            Box::new(EmbeddedSource::new(client)),
            policy,
        )
    }

    pub fn with_adapters(
        structured: Box<dyn SourceAdapter>,
        embedded: Box<dyn SourceAdapter>,
        policy: FailurePolicy,
    ) -> Self {
        debug_assert_eq!(structured.kind(), SourceKind::Structured);
        debug_assert_eq!(embedded.kind(), SourceKind::Embedded);
        Self {
            structured,
            embedded,
            policy,
        }
    }

    fn adapter(&self, kind: SourceKind) -> &dyn SourceAdapter {
        match kind {
            SourceKind::Structured => self.structured.as_ref(),
            SourceKind::Embedded => self.embedded.as_ref(),
        }
    }

    pub async fn aggregate(
        &self,
        structured: &[String],
        embedded: &[String],
    ) -> Result<Aggregation, AggregationError> {
        let locations = SourceLocations {
            structured: structured.to_vec(),
            embedded: embedded.to_vec(),
        };
        self.aggregate_locations(&locations).await
    }

    pub async fn aggregate_locations(
        &self,
        locations: &SourceLocations,
    ) -> Result<Aggregation, AggregationError> {
        let tasks = locations.iter().map(|location| async move {
            let result = self.adapter(location.kind).fetch(location.url).await;
            (location, result)
        });
        let results = join_all(tasks).await;
        self.merge(results)
    }

    fn merge(
        &self,
        results: Vec<(SourceLocation<'_>, Result<Option<SourceBatch>, SourceError>)>,
    ) -> Result<Aggregation, AggregationError> {
        let total = results.len();
        let mut batches = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (location, result) in results {
            match result {
                Ok(Some(batch)) => batches.push((location, batch)),
                Ok(None) => {}
                Err(error) => {
                    warn!(url = %location.url, kind = %location.kind, error = %error, "Source failed");
                    failures.push(SourceFailure {
                        url: location.url.to_owned(),
                        kind: location.kind,
                        error,
                    });
                }
            }
        }

        if !failures.is_empty() && self.policy == FailurePolicy::AllOrNothing {
            return Err(AggregationError { total, failures });
        }

        let records: Vec<AccountRecord> = batches
            .into_iter()
            .filter_map(|(location, batch)| {
                let outcome = batch.outcome_flag.clone();
                let records = batch.into_records();
                if records.is_none() {
                    debug!(url = %location.url, outcome = %outcome, "Dropping unusable batch");
                }
                records
            })
            .flatten()
            .filter(AccountRecord::is_valid)
            .collect();

        info!(
            sources = total,
            failed = failures.len(),
            records = records.len(),
            "Aggregated sources"
        );
        Ok(Aggregation { records, failures })
    }
}
