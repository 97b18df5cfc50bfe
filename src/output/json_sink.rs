//! Pretty-printed JSON dataset sink

use crate::output::traits::{ListingSink, OutputResult};
use crate::processing::NormalizedListing;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Dataset as one JSON array of listing objects
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink;

impl ListingSink for JsonSink {
    fn write(&self, listings: &[NormalizedListing], path: &Path) -> OutputResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, listings)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
