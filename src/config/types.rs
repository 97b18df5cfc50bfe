use crate::crawler::TraversalStrategy;
use crate::output::OutputFormat;
use crate::processing::SortKey;
use crate::source::Source;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Listing-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub pacer: PacerConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    pub output: OutputConfig,
}

/// Traversal behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of listings fetched per session; retries of one
    /// listing count once (unbounded when absent)
    #[serde(rename = "max-visits", default)]
    pub max_visits: Option<u32>,

    /// Order in which discovered listings are visited
    #[serde(default)]
    pub strategy: TraversalStrategy,

    /// Retries after the first attempt for retryable failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry (milliseconds)
    #[serde(rename = "retry-base-delay-ms", default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Upper bound for any single backoff (milliseconds)
    #[serde(rename = "retry-max-delay-ms", default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Per-request timeout for the HTTP client (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_visits: None,
            strategy: TraversalStrategy::default(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Delay drawn before every fetch
#[derive(Debug, Clone, Deserialize)]
pub struct PacerConfig {
    /// Lower bound of the random delay (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the random delay (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 2_000,
            max_delay_ms: 5_000,
        }
    }
}

/// Listing API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Which API family to talk to
    pub kind: Source,

    /// Endpoint returning one listing snapshot
    #[serde(rename = "api-base-url")]
    pub api_base_url: String,

    /// OLX region filter sent with every recommendation request
    #[serde(rename = "region-id", default = "default_region_id")]
    pub region_id: String,

    /// OLX subcategory sent with every recommendation request
    #[serde(rename = "subcategory-id", default = "default_subcategory_id")]
    pub subcategory_id: String,

    /// Listing ids the crawl starts from
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Request headers, sent as-is
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Inclusion rules applied to candidates and to normalized records
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Category codes that are real-estate listings
    #[serde(rename = "allowed-categories", default = "default_allowed_categories")]
    pub allowed_categories: Vec<String>,

    /// Gallery titles whose ads are never followed
    #[serde(rename = "denied-gallery-titles", default = "default_denied_gallery_titles")]
    pub denied_gallery_titles: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            allowed_categories: default_allowed_categories(),
            denied_gallery_titles: default_denied_gallery_titles(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding raw snapshots
    #[serde(rename = "raw-root")]
    pub raw_root: String,

    /// Directory receiving the processed dataset
    #[serde(rename = "processed-root")]
    pub processed_root: String,

    /// Dataset formats written by `process`
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,

    /// Optional ordering of the final dataset
    #[serde(rename = "sort-by", default)]
    pub sort_by: Option<SortKey>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_region_id() -> String {
    "81".to_string()
}

fn default_subcategory_id() -> String {
    "1020".to_string()
}

fn default_allowed_categories() -> Vec<String> {
    vec!["1020".to_string(), "1010".to_string()]
}

fn default_denied_gallery_titles() -> Vec<String> {
    vec!["Produtos para sua casa".to_string()]
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Csv, OutputFormat::Parquet]
}
