//! Parquet dataset sink

use crate::output::traits::{ListingSink, OutputResult};
use crate::processing::NormalizedListing;
use arrow_array::{ArrayRef, Float64Array, RecordBatch, StringArray, TimestampMillisecondArray};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Columnar dataset for analysis tools
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetSink;

fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("listing_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, true),
        Field::new("price", DataType::Float64, true),
        Field::new("url", DataType::Utf8, true),
        Field::new("image_url", DataType::Utf8, true),
        Field::new("neighborhood", DataType::Utf8, true),
        Field::new("city", DataType::Utf8, true),
        Field::new("state", DataType::Utf8, true),
        Field::new(
            "listed_at",
            DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
            false,
        ),
    ]))
}

fn text_column<F>(listings: &[NormalizedListing], field: F) -> ArrayRef
where
    F: Fn(&NormalizedListing) -> Option<&str>,
{
    Arc::new(StringArray::from(
        listings.iter().map(field).collect::<Vec<_>>(),
    ))
}

/// Builds the record batch written by the sink
pub fn record_batch(listings: &[NormalizedListing]) -> OutputResult<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        text_column(listings, |l| Some(l.listing_id.as_str())),
        text_column(listings, |l| l.title.as_deref()),
        Arc::new(Float64Array::from(
            listings.iter().map(|l| l.price).collect::<Vec<_>>(),
        )),
        text_column(listings, |l| l.url.as_deref()),
        text_column(listings, |l| l.image_url.as_deref()),
        text_column(listings, |l| l.neighborhood.as_deref()),
        text_column(listings, |l| l.city.as_deref()),
        text_column(listings, |l| l.state.as_deref()),
        Arc::new(
            TimestampMillisecondArray::from(
                listings
                    .iter()
                    .map(|l| l.listed_at.timestamp_millis())
                    .collect::<Vec<_>>(),
            )
            .with_timezone("UTC"),
        ),
    ];

    Ok(RecordBatch::try_new(schema(), columns)?)
}

impl ListingSink for ParquetSink {
    fn write(&self, listings: &[NormalizedListing], path: &Path) -> OutputResult<()> {
        let batch = record_batch(listings)?;
        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }
}
