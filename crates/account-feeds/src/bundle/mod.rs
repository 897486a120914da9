//! Recovery of source locations from an obfuscated bundle.
//!
//! A bundle decodes into `<structured>||<embedded>`, and each half decodes
//! again into newline-separated compact tokens, one per source.

mod cipher;
mod location;

pub use cipher::{SHIFT, decode};
pub use location::{SCHEME, format_location};

use serde::Serialize;
use tracing::debug;

use crate::error::DecodeError;
use crate::source::{SourceKind, SourceLocation};

pub const DELIMITER: &str = "||";

/// Bundle baked in at build time through `ACCOUNT_FEEDS_BUNDLE`, if any.
pub const BUILD_BUNDLE: Option<&str> = option_env!("ACCOUNT_FEEDS_BUNDLE");

/// Decodes `bundle` and splits it into its two obfuscated halves.
pub fn split_bundle(bundle: &str) -> Result<(String, String), DecodeError> {
    let plain = decode(bundle)?;
    let parts: Vec<&str> = plain.split(DELIMITER).collect();
    match parts.as_slice() {
        [structured, embedded] => Ok(((*structured).to_owned(), (*embedded).to_owned())),
        _ => Err(DecodeError::Structure { parts: parts.len() }),
    }
}

/// Decodes one half of a bundle into formatted locations.
pub fn decode_locations(sub_bundle: &str) -> Result<Vec<String>, DecodeError> {
    let plain = decode(sub_bundle)?;
    Ok(plain
        .split('\n')
        .map(|token| token.trim())
        .filter(|token| {
            if token.is_empty() {
                debug!("Skipping blank token");
                return false;
            }
            true
        })
        .map(format_location)
        .collect())
}

/// Source locations grouped by response shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceLocations {
    pub structured: Vec<String>,
    pub embedded: Vec<String>,
}

impl SourceLocations {
    pub fn from_bundle(bundle: &str) -> Result<Self, DecodeError> {
        let (structured, embedded) = split_bundle(bundle)?;
        let locations = Self {
            structured: decode_locations(&structured)?,
            embedded: decode_locations(&embedded)?,
        };
        debug!(
            structured = locations.structured.len(),
            embedded = locations.embedded.len(),
            "Decoded source locations"
        );
        Ok(locations)
    }

    pub fn len(&self) -> usize {
        self.structured.len() + self.embedded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All locations, structured group first, each group in bundle order.
    pub fn iter(&self) -> impl Iterator<Item = SourceLocation<'_>> {
        let structured = self
            .structured
            .iter()
            .map(|url| SourceLocation::new(SourceKind::Structured, url));
        let embedded = self
            .embedded
            .iter()
            .map(|url| SourceLocation::new(SourceKind::Embedded, url));
        structured.chain(embedded)
    }
}
