//! Output sink traits and error types
//!
//! This module defines the trait interface for dataset sinks and the
//! associated error types.

use crate::processing::NormalizedListing;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A writer for one dataset format
///
/// Every sink writes the same columns in the same order:
/// `listing_id, title, price, url, image_url, neighborhood, city, state,
/// listed_at`.
pub trait ListingSink {
    /// Writes the whole dataset to `path`, replacing any previous file
    fn write(&self, listings: &[NormalizedListing], path: &Path) -> OutputResult<()>;
}
