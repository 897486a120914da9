use account_feeds::error::{DecodeError, TransportError};
use account_feeds::render::RenderError;
use account_feeds::FeedError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Feed(#[from] FeedError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("HTTP client error: {0}")]
    Transport(#[from] TransportError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
