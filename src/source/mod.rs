//! Listing sources and their API conventions
//!
//! This module knows the two supported listing APIs:
//! - OLX, whose recommendation endpoint returns gallery groups of related ads
//! - ZAP, whose detail endpoint returns one flat listing object
//!
//! It owns the identifiers shared by every other layer and builds the
//! per-listing fetch requests from configuration.

pub mod payload;

use crate::config::SourceConfig;
use crate::crawler::FetchRequest;
use crate::{ConfigError, ConfigResult, RippleError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use url::Url;

pub use payload::{parse_payload, PayloadEntry, PayloadError, PayloadShape};

/// The listing API a snapshot was collected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Olx,
    Zap,
}

impl Source {
    /// Lower-case name used in config files, CLI arguments and snapshot names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Olx => "olx",
            Self::Zap => "zap",
        }
    }

    pub fn all() -> [Self; 2] {
        [Self::Olx, Self::Zap]
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "olx" => Ok(Self::Olx),
            "zap" => Ok(Self::Zap),
            _ => Err(ConfigError::UnknownSource(s.to_string())),
        }
    }
}

/// Identifier of a listing, unique per source
///
/// Identifiers are embedded in snapshot file names, so only ASCII
/// alphanumerics, `-` and `_` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    /// Validates and wraps a raw identifier
    ///
    /// Returns None for empty identifiers or identifiers containing
    /// characters that are unsafe in a file name.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return None;
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Reads an identifier that the APIs send either as a string or as an integer
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::new(s),
            Value::Number(n) if n.is_u64() || n.is_i64() => Self::new(n.to_string()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ListingId {
    type Err = RippleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| RippleError::InvalidListingId(s.to_string()))
    }
}

/// Builds fetch requests for one source from its configuration
///
/// OLX requests target the recommendation endpoint with the listing id as a
/// query parameter; ZAP requests append the id to the base path. Headers are
/// passed through from configuration untouched.
#[derive(Debug, Clone)]
pub struct SourceApi {
    source: Source,
    base_url: Url,
    region_id: String,
    subcategory_id: String,
    lurker_id: String,
    headers: Vec<(String, String)>,
}

impl SourceApi {
    /// Creates the request builder for a crawl session
    ///
    /// A fresh `lurker_id` is generated per session, the way the OLX web
    /// client identifies an anonymous visitor.
    pub fn from_config(config: &SourceConfig) -> ConfigResult<Self> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid api_base_url '{}': {}", config.api_base_url, e))
        })?;

        let mut headers: Vec<(String, String)> = config
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        headers.sort();

        Ok(Self {
            source: config.kind,
            base_url,
            region_id: config.region_id.clone(),
            subcategory_id: config.subcategory_id.clone(),
            lurker_id: uuid::Uuid::new_v4().to_string(),
            headers,
        })
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Builds the request that returns the snapshot for one listing
    pub fn request_for(&self, listing_id: &ListingId) -> FetchRequest {
        match self.source {
            Source::Olx => FetchRequest {
                endpoint: self.base_url.clone(),
                query: vec![
                    ("custom_tag".to_string(), "vi_web".to_string()),
                    ("list_id".to_string(), listing_id.to_string()),
                    ("lurker_id".to_string(), self.lurker_id.clone()),
                    ("object_name".to_string(), "ad_detail".to_string()),
                    ("platform".to_string(), "web".to_string()),
                    ("region_id".to_string(), self.region_id.clone()),
                    ("subcategory_id".to_string(), self.subcategory_id.clone()),
                    ("test_id".to_string(), "hold".to_string()),
                ],
                headers: self.headers.clone(),
            },
            Source::Zap => {
                let mut endpoint = self.base_url.clone();
                if let Ok(mut segments) = endpoint.path_segments_mut() {
                    segments.pop_if_empty().push(listing_id.as_str());
                }
                FetchRequest {
                    endpoint,
                    query: Vec::new(),
                    headers: self.headers.clone(),
                }
            }
        }
    }
}
