use std::fs;
use std::path::{Path, PathBuf};

use account_feeds::FeedConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::OutputFormat;
use crate::error::{AppError, Result};

pub const DEFAULT_PROMOTION_URL: &str = "https://example.com/register";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Obfuscated source bundle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,
    /// JSON region map, the built-in table is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_map: Option<PathBuf>,
    /// Registration page the affiliate id is appended to
    pub promotion_url: String,
    /// Page url consulted for the `aff` query parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    pub output: OutputFormat,
    pub feed: FeedConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bundle: None,
            region_map: None,
            promotion_url: DEFAULT_PROMOTION_URL.to_string(),
            page_url: None,
            output: OutputFormat::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("afeed").join("config.toml"))
    }

    fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
        path.map(Path::to_path_buf)
            .or_else(Self::default_path)
            .ok_or_else(|| AppError::Config("no configuration directory available".to_string()))
    }

    /// Loads the configuration, falling back to defaults when the file is missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match Self::resolve_path(path) {
            Ok(path) => path,
            Err(_) => return Ok(Self::default()),
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config = toml::from_str(&content)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = Self::resolve_path(path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, self.show()?)?;
        Ok(path)
    }

    pub fn reset(path: Option<&Path>) -> Result<PathBuf> {
        Self::default().save(path)
    }

    pub fn show(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
