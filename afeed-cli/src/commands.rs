use std::sync::Arc;

use account_feeds::bundle::BUILD_BUNDLE;
use account_feeds::source::{HttpTransport, RetrievalClient, default_client};
use account_feeds::{CycleDeps, FailurePolicy, FeedConfig, FeedError, SourceLocations, run_cycle};
use tracing::{debug, warn};

use crate::cli::{FetchArgs, OutputFormat};
use crate::config::AppConfig;
use crate::error::Result;
use crate::output::OutputManager;
use crate::regions;

pub struct CommandExecutor {
    config: AppConfig,
    colored: bool,
}

impl CommandExecutor {
    pub fn new(config: AppConfig, colored: bool) -> Self {
        Self { config, colored }
    }

    fn output(&self, format: OutputFormat) -> OutputManager {
        OutputManager::new(format, self.colored)
    }

    /// Command line bundle, then the configured one, then the build-time one.
    fn bundle<'a>(&'a self, explicit: Option<&'a str>) -> Option<&'a str> {
        explicit
            .or(self.config.bundle.as_deref())
            .or(BUILD_BUNDLE)
    }

    fn feed_config(&self, args: &FetchArgs) -> FeedConfig {
        let mut feed = self.config.feed.clone();
        if let Some(timeout_ms) = args.timeout_ms {
            feed.deadline_ms = timeout_ms;
        }
        if let Some(retries) = args.retries {
            feed.max_retries = retries;
        }
        if args.isolate_failures {
            feed.failure_policy = FailurePolicy::Isolate;
        }
        feed
    }

    fn retrieval_client(feed: &FeedConfig) -> Result<RetrievalClient> {
        let mut transport = HttpTransport::new(default_client()?);
        if let Some(user_agent) = feed.user_agent.as_deref() {
            transport = transport.with_user_agent(user_agent);
        }
        Ok(RetrievalClient::new(
            Arc::new(transport),
            feed.retry_policy(),
        ))
    }

    pub async fn fetch(&self, args: FetchArgs, bundle: Option<&str>) -> Result<()> {
        let feed = self.feed_config(&args);
        debug!(?feed, "Feed settings");

        let output = args.output.unwrap_or(self.config.output);
        let renderer = self.output(output);
        let regions = regions::loader(args.region_map.or_else(|| self.config.region_map.clone()));
        let page_url = args.page_url.as_deref().or(self.config.page_url.as_deref());

        let report = run_cycle(CycleDeps {
            client: Self::retrieval_client(&feed)?,
            renderer: &renderer,
            regions: regions.as_ref(),
            bundle: self.bundle(bundle),
            affiliate: args.aff.as_deref(),
            page_url,
            promotion_base: &self.config.promotion_url,
            failure_policy: feed.failure_policy,
        })
        .await;

        for failure in &report.failed_sources {
            warn!(url = %failure.url, kind = %failure.kind, "Skipped failed source");
        }
        report.outcome?;
        Ok(())
    }

    pub fn decode(&self, bundle: Option<&str>, output: OutputFormat) -> Result<()> {
        let bundle = self.bundle(bundle).ok_or(FeedError::MissingBundle)?;
        let locations = SourceLocations::from_bundle(bundle)?;
        debug!(sources = locations.len(), "Decoded bundle");

        let manager = self.output(output);
        manager.print(&manager.format_locations(&locations)?)?;
        Ok(())
    }
}
