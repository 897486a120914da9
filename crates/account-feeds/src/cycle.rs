//! One full retrieval cycle: decode, fetch, aggregate, render.

use tracing::{debug, error, info, warn};
use url::Url;

use crate::aggregate::{Aggregation, AggregationPipeline, FailurePolicy};
use crate::bundle::{BUILD_BUNDLE, SourceLocations};
use crate::error::{FeedError, SourceFailure};
use crate::render::{RegionMap, RegionMapLoader, RenderContext, Renderer};
use crate::source::RetrievalClient;

pub const DEFAULT_AFFILIATE: &str = "123456";
pub const AFFILIATE_PARAM: &str = "aff";

/// Picks the affiliate id: explicit value, then the `aff` query parameter
/// of `page_url`, then [`DEFAULT_AFFILIATE`]. Empty values are skipped.
pub fn resolve_affiliate(explicit: Option<&str>, page_url: Option<&str>) -> String {
    if let Some(aff) = explicit.filter(|a| !a.is_empty()) {
        return aff.to_owned();
    }

    page_url
        .and_then(|page| Url::parse(page).ok())
        .and_then(|page| {
            page.query_pairs()
                .find(|(key, _)| key == AFFILIATE_PARAM)
                .map(|(_, value)| value.into_owned())
        })
        .filter(|aff| !aff.is_empty())
        .unwrap_or_else(|| DEFAULT_AFFILIATE.to_owned())
}

/// Appends the affiliate id to the registration page url.
pub fn promotion_link(base: &str, affiliate: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut().append_pair(AFFILIATE_PARAM, affiliate);
    Ok(url.into())
}

/// Decodes `bundle` and aggregates every source it names.
pub async fn fetch_records(
    client: RetrievalClient,
    bundle: &str,
    policy: FailurePolicy,
) -> Result<Aggregation, FeedError> {
    let locations = SourceLocations::from_bundle(bundle)?;
    let pipeline = AggregationPipeline::new(client, policy);
    Ok(pipeline.aggregate_locations(&locations).await?)
}

/// Everything a cycle depends on.
pub struct CycleDeps<'a> {
    pub client: RetrievalClient,
    pub renderer: &'a dyn Renderer,
    pub regions: &'a dyn RegionMapLoader,
    /// Falls back to the bundle baked in at build time.
    pub bundle: Option<&'a str>,
    pub affiliate: Option<&'a str>,
    pub page_url: Option<&'a str>,
    pub promotion_base: &'a str,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug)]
pub struct CycleReport {
    pub affiliate: String,
    pub promotion_link: String,
    pub rendered: usize,
    pub failed_sources: Vec<SourceFailure>,
    pub outcome: Result<(), FeedError>,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Runs one cycle and reports how it ended.
///
/// Failures are logged and returned in the report, never raised;
/// [`Renderer::finish`] runs in every case.
pub async fn run_cycle(deps: CycleDeps<'_>) -> CycleReport {
    let affiliate = resolve_affiliate(deps.affiliate, deps.page_url);
    let promotion_link = promotion_link(deps.promotion_base, &affiliate).unwrap_or_else(|e| {
        warn!(base = %deps.promotion_base, error = %e, "Invalid promotion url");
        String::new()
    });

    deps.renderer.start();

    let regions = match deps.regions.load().await {
        Ok(map) if map.is_empty() => {
            debug!("Region map is empty; every record is tagged as unknown");
            map
        }
        Ok(map) => {
            debug!(entries = map.len(), "Region map loaded");
            map
        }
        Err(e) => {
            warn!(error = %e, "Region map unavailable; using an empty map");
            RegionMap::default()
        }
    };
    let context = RenderContext {
        regions: &regions,
        promotion_link: &promotion_link,
    };

    let result = match deps.bundle.or(BUILD_BUNDLE) {
        Some(bundle) => fetch_records(deps.client, bundle, deps.failure_policy).await,
        None => Err(FeedError::MissingBundle),
    };

    let mut report = CycleReport {
        affiliate,
        promotion_link: promotion_link.clone(),
        rendered: 0,
        failed_sources: Vec::new(),
        outcome: Ok(()),
    };

    match result {
        Ok(aggregation) => {
            if let Err(e) = deps.renderer.render(&aggregation.records, &context) {
                error!(error = %e, "Renderer failed");
            } else {
                report.rendered = aggregation.records.len();
            }
            report.failed_sources = aggregation.failures;
            info!(
                rendered = report.rendered,
                failed = report.failed_sources.len(),
                "Cycle finished"
            );
        }
        Err(e) => {
            error!(error = %e, "Error while processing accounts");
            report.outcome = Err(e);
        }
    }

    deps.renderer.finish();
    debug!(affiliate = %report.affiliate, "Cycle complete");
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affiliate_priority() {
        let page = Some("https://example.com/?aff=777&x=1");
        assert_eq!(resolve_affiliate(Some("42"), page), "42");
        assert_eq!(resolve_affiliate(None, page), "777");
        assert_eq!(resolve_affiliate(Some(""), page), "777");
        assert_eq!(resolve_affiliate(None, Some("https://example.com/?x=1")), "123456");
        assert_eq!(resolve_affiliate(None, Some("https://example.com/?aff=")), "123456");
        assert_eq!(resolve_affiliate(None, Some("not a url")), "123456");
        assert_eq!(resolve_affiliate(None, None), DEFAULT_AFFILIATE);
    }

    #[test]
    fn test_promotion_link() {
        assert_eq!(
            promotion_link("https://example.com/register", "42").unwrap(),
            "https://example.com/register?aff=42"
        );
        assert_eq!(
            promotion_link("https://example.com/register?ref=a", "4 2").unwrap(),
            "https://example.com/register?ref=a&aff=4+2"
        );
        assert!(promotion_link("register", "42").is_err());
    }
}
