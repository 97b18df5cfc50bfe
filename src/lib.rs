//! Listing-Ripple: a polite recommendation-graph harvester for real-estate listings
//!
//! This crate walks the "related listings" graph exposed by listing APIs,
//! persists every raw response verbatim, and later normalizes the harvested
//! snapshots into a deduplicated tabular dataset.

pub mod config;
pub mod crawler;
pub mod filter;
pub mod output;
pub mod processing;
pub mod source;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Listing-Ripple operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid listing id: {0:?}")]
    InvalidListingId(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
///
/// Every variant is fatal: it is reported before any crawl or processing work
/// starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown source: {0:?} (expected \"olx\" or \"zap\")")]
    UnknownSource(String),

    #[error("Raw data root is not readable: {path}: {reason}")]
    UnreadableRawRoot { path: String, reason: String },
}

/// Result type alias for Listing-Ripple operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CrawlReport};
pub use filter::CategoryFilter;
pub use processing::{process, ProcessingReport};
pub use source::{ListingId, Source};
pub use state::{NodeState, VisitedSet};
pub use storage::RawEnvelope;
