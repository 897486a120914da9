//! Seams to the presentation layer.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::FeedError;
use crate::source::AccountRecord;

/// Tag used for regions missing from the map.
pub const UNKNOWN_TAG: &str = "un";

/// Region code to display tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionMap(HashMap<String, String>);

impl RegionMap {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self(entries)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn tag(&self, region: Option<&str>) -> &str {
        region
            .and_then(|r| self.0.get(r))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_TAG)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[async_trait]
pub trait RegionMapLoader: Send + Sync {
    async fn load(&self) -> Result<RegionMap, FeedError>;
}

/// A loader that hands out a map it already holds.
#[derive(Debug, Clone, Default)]
pub struct StaticRegionMap(pub RegionMap);

#[async_trait]
impl RegionMapLoader for StaticRegionMap {
    async fn load(&self) -> Result<RegionMap, FeedError> {
        Ok(self.0.clone())
    }
}

/// Everything a renderer gets for one cycle.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub regions: &'a RegionMap,
    pub promotion_link: &'a str,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait Renderer: Send + Sync {
    /// Called first, before the region map is loaded or any source is contacted.
    fn start(&self) {}

    fn render(
        &self,
        records: &[AccountRecord],
        context: &RenderContext<'_>,
    ) -> Result<(), RenderError>;

    /// Always called once the cycle is over, whether it succeeded or not.
    fn finish(&self) {}
}
