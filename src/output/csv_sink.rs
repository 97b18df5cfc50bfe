//! CSV dataset sink

use crate::output::traits::{ListingSink, OutputResult};
use crate::output::COLUMNS;
use crate::processing::NormalizedListing;
use std::path::Path;

/// Human-readable dataset, one listing per row
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSink;

impl ListingSink for CsvSink {
    fn write(&self, listings: &[NormalizedListing], path: &Path) -> OutputResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;

        // Header is written explicitly so an empty dataset still has one
        writer.write_record(COLUMNS)?;
        for listing in listings {
            writer.serialize(listing)?;
        }
        writer.flush()?;
        Ok(())
    }
}
