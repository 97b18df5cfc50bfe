//! Offline processing of harvested snapshots
//!
//! This module turns one source's raw snapshots into its final dataset:
//! - Listing the source's snapshots in store order
//! - Normalizing snapshots in parallel, one task per file
//! - Reducing the results in store order into one deduplicated set
//! - Writing the configured output formats and a markdown summary

mod aggregate;
pub mod coerce;
mod normalize;

pub use aggregate::{aggregate, AggregateOutcome, SortKey};
pub use normalize::{NormalizedBatch, NormalizedListing, Normalizer, RejectReason, Rejection};

use crate::config::Config;
use crate::filter::CategoryFilter;
use crate::output::{write_dataset, write_processing_summary};
use crate::source::Source;
use crate::storage::{FsSnapshotStore, SnapshotFilter, SnapshotStore};
use crate::{ConfigError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Upper bound on snapshot files read at the same time
const MAX_OPEN_SNAPSHOTS: usize = 64;

/// Outcome of a processing run
#[derive(Debug, Clone, Default)]
pub struct ProcessingReport {
    /// Source whose snapshots were processed
    pub source: Option<Source>,
    /// Snapshot files read
    pub files: usize,
    /// Listings normalized before deduplication
    pub normalized: usize,
    /// Listings left after deduplication
    pub unique: usize,
    /// Records collapsed into a newer record for the same id
    pub duplicates: usize,
    /// Records dropped by the category filter
    pub filtered: usize,
    /// Every rejected record, in store order
    pub rejections: Vec<Rejection>,
    /// Dataset files written
    pub outputs: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl ProcessingReport {
    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }
}

/// Everything normalization produced for one store, before output
#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    pub files: usize,
    pub normalized: usize,
    pub filtered: usize,
    pub rejections: Vec<Rejection>,
    pub aggregate: AggregateOutcome,
}

/// Normalizes every snapshot matched by `filter` and aggregates the result
///
/// Files are normalized concurrently, but batches are reduced in the
/// store's listing order, so the outcome does not depend on which task
/// finishes first.
pub async fn normalize_store(
    store: Arc<dyn SnapshotStore>,
    filter: &SnapshotFilter,
    normalizer: Normalizer,
    sort: Option<SortKey>,
) -> Result<NormalizeOutcome> {
    let locations = store.list(filter).await?;
    let files = locations.len();
    tracing::info!("Normalizing {} snapshot files", files);

    let normalizer = Arc::new(normalizer);
    let permits = Arc::new(Semaphore::new(MAX_OPEN_SNAPSHOTS));
    let mut tasks = JoinSet::new();

    for (position, location) in locations.into_iter().enumerate() {
        let store = Arc::clone(&store);
        let normalizer = Arc::clone(&normalizer);
        let permits = Arc::clone(&permits);

        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            let batch = match store.get(&location).await {
                Ok(envelope) => normalizer.normalize(&envelope),
                Err(e) => NormalizedBatch {
                    rejections: vec![RejectReason::Unreadable(e.to_string())],
                    ..NormalizedBatch::default()
                },
            };
            (position, location, batch)
        });
    }

    let mut batches = Vec::with_capacity(files);
    while let Some(joined) = tasks.join_next().await {
        batches.push(joined?);
    }
    batches.sort_by_key(|(position, _, _)| *position);

    let mut outcome = NormalizeOutcome {
        files,
        ..NormalizeOutcome::default()
    };
    let mut listings = Vec::new();

    for (_, location, batch) in batches {
        tracing::debug!(
            "{}: {} listings, {} rejected, {} filtered",
            location,
            batch.listings.len(),
            batch.rejections.len(),
            batch.filtered
        );
        outcome.normalized += batch.listings.len();
        outcome.filtered += batch.filtered;
        for reason in batch.rejections {
            tracing::warn!("Rejected record in {}: {}", location, reason);
            outcome.rejections.push(Rejection {
                snapshot: location.to_string(),
                reason,
            });
        }
        listings.extend(batch.listings);
    }

    outcome.aggregate = aggregate(listings, sort);
    Ok(outcome)
}

/// Runs the processing stage described by `config`
///
/// Reads the snapshots of the configured source under the raw root, writes
/// the deduplicated dataset in each configured format under
/// `{processed_root}/{source}/`, and writes `summary.md` next to it.
/// Listing ids are only unique per source, so one run never mixes sources.
///
/// # Returns
///
/// * `Ok(ProcessingReport)` - Processing finished (individual rejections
///   are reported, not returned as errors)
/// * `Err(RippleError)` - The raw root is unreadable or an output could not
///   be written
pub async fn process(config: &Config) -> Result<ProcessingReport> {
    let started = Instant::now();
    let raw_root = Path::new(&config.output.raw_root);
    ensure_readable_dir(raw_root).await?;

    let source = config.source.kind;
    tracing::info!("Processing {} snapshots from {}", source, raw_root.display());

    let store: Arc<dyn SnapshotStore> = Arc::new(FsSnapshotStore::new(raw_root));
    let normalizer = Normalizer::new(CategoryFilter::from_config(&config.filter));
    let outcome = normalize_store(
        store,
        &SnapshotFilter::source(source),
        normalizer,
        config.output.sort_by,
    )
    .await?;

    let processed_root = processed_dir(config);
    let listings = outcome.aggregate.listings;
    let outputs = {
        let processed_root = processed_root.clone();
        let formats = config.output.formats.clone();
        let listings = listings.clone();
        tokio::task::spawn_blocking(move || write_dataset(&listings, &processed_root, &formats))
            .await??
    };

    let report = ProcessingReport {
        source: Some(source),
        files: outcome.files,
        normalized: outcome.normalized,
        unique: listings.len(),
        duplicates: outcome.aggregate.duplicates,
        filtered: outcome.filtered,
        rejections: outcome.rejections,
        outputs,
        elapsed: started.elapsed(),
    };

    write_processing_summary(&report, &processed_root.join("summary.md"))?;

    tracing::info!(
        "Processing complete: {} files, {} unique listings, {} duplicates, {} rejected, {} filtered",
        report.files,
        report.unique,
        report.duplicates,
        report.rejected(),
        report.filtered
    );

    Ok(report)
}

/// Directory receiving the dataset of the configured source
pub fn processed_dir(config: &Config) -> PathBuf {
    PathBuf::from(&config.output.processed_root).join(config.source.kind.as_str())
}

async fn ensure_readable_dir(path: &Path) -> Result<()> {
    let unreadable = |reason: String| ConfigError::UnreadableRawRoot {
        path: path.display().to_string(),
        reason,
    };

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| unreadable(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(unreadable("not a directory".to_string()).into());
    }
    tokio::fs::read_dir(path)
        .await
        .map_err(|e| unreadable(e.to_string()))?;
    Ok(())
}
