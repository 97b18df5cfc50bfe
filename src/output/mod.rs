//! Output module for writing datasets and run summaries
//!
//! This module handles:
//! - Writing the processed dataset as CSV, Parquet or JSON
//! - Generating markdown summaries of crawl and processing runs
//! - Printing run reports to stdout

mod csv_sink;
mod json_sink;
mod markdown;
mod parquet_sink;
pub mod stats;
mod traits;

pub use csv_sink::CsvSink;
pub use json_sink::JsonSink;
pub use markdown::{
    format_crawl_summary, format_processing_summary, write_crawl_summary,
    write_processing_summary,
};
pub use parquet_sink::{record_batch, ParquetSink};
pub use stats::{print_crawl_report, print_processing_report};
pub use traits::{ListingSink, OutputError, OutputResult};

use crate::processing::NormalizedListing;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Dataset columns, in output order
pub const COLUMNS: [&str; 9] = [
    "listing_id",
    "title",
    "price",
    "url",
    "image_url",
    "neighborhood",
    "city",
    "state",
    "listed_at",
];

/// Base name of every dataset file
pub const DATASET_STEM: &str = "listings";

/// Supported dataset formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Parquet,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
            Self::Json => "json",
        }
    }

    /// The sink that writes this format
    pub fn sink(&self) -> Box<dyn ListingSink> {
        match self {
            Self::Csv => Box::new(CsvSink),
            Self::Parquet => Box::new(ParquetSink),
            Self::Json => Box::new(JsonSink),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Writes the dataset once per requested format
///
/// Files are named `listings.{ext}` under `dir`, which is created if
/// needed. Repeated formats are written once.
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - Paths of the files written, in format order
/// * `Err(OutputError)` - A directory or file could not be written
pub fn write_dataset(
    listings: &[NormalizedListing],
    dir: &Path,
    formats: &[OutputFormat],
) -> OutputResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for format in formats {
        let path = dir.join(format!("{}.{}", DATASET_STEM, format.extension()));
        if written.contains(&path) {
            continue;
        }
        format.sink().write(listings, &path)?;
        tracing::info!("Wrote {} listings to {}", listings.len(), path.display());
        written.push(path);
    }

    Ok(written)
}
