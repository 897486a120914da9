use std::path::PathBuf;

use account_feeds::FeedError;
use account_feeds::render::{RegionMap, RegionMapLoader};
use async_trait::async_trait;

const BUILTIN_REGIONS: &str = include_str!("../assets/regions.json");

/// Region table compiled into the binary.
pub struct BuiltinRegions;

#[async_trait]
impl RegionMapLoader for BuiltinRegions {
    async fn load(&self) -> Result<RegionMap, FeedError> {
        RegionMap::from_json(BUILTIN_REGIONS)
            .map_err(|e| FeedError::RegionMap(format!("built-in table: {e}")))
    }
}

/// Region table read from a JSON file when the cycle starts.
pub struct FileRegions {
    path: PathBuf,
}

impl FileRegions {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl RegionMapLoader for FileRegions {
    async fn load(&self) -> Result<RegionMap, FeedError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FeedError::RegionMap(format!("{}: {e}", self.path.display())))?;
        RegionMap::from_json(&content)
            .map_err(|e| FeedError::RegionMap(format!("{}: {e}", self.path.display())))
    }
}

pub fn loader(path: Option<PathBuf>) -> Box<dyn RegionMapLoader> {
    match path {
        Some(path) => Box::new(FileRegions::new(path)),
        None => Box::new(BuiltinRegions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builtin_table_parses() {
        let map = BuiltinRegions.load().await.unwrap();
        assert_eq!(map.tag(Some("美国")), "us");
        assert_eq!(map.tag(Some("JP")), "jp");
    }

    #[tokio::test]
    async fn test_file_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");
        std::fs::write(&path, r#"{"Mars": "mx"}"#).unwrap();

        let map = loader(Some(path)).load().await.unwrap();
        assert_eq!(map.tag(Some("Mars")), "mx");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let err = loader(Some(PathBuf::from("/nonexistent/regions.json")))
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::RegionMap(_)));
    }
}
