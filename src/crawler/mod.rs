//! Crawler module for listing graph traversal
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Candidate extraction from recommendation payloads
//! - Frontier ordering and request pacing
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod pacer;
mod parser;
mod retry;

pub use coordinator::{parse_seeds, Coordinator, CrawlReport, FailedNode};
pub use fetcher::{
    build_http_client, check_status, FetchClient, FetchError, FetchRequest, FetchResponse,
    HttpFetchClient, TransportError,
};
pub use frontier::{Frontier, QueuedListing, TraversalStrategy};
pub use pacer::{wait_or_cancel, JitterPacer, NoDelay, Pacer};
pub use parser::{extract_candidates, CandidateListing};
pub use retry::RetryPolicy;

use crate::config::Config;
use crate::source::ListingId;
use crate::storage::FsSnapshotStore;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl session
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client and the snapshot store under `raw_root`
/// 2. Seed the frontier (configured seeds when `seeds` is empty)
/// 3. Fetch, persist and expand listings until the frontier drains, the
///    visit budget is spent, or `cancel` fires
///
/// # Arguments
///
/// * `seeds` - Listing ids to start from
/// * `config` - The crawler configuration
/// * `cancel` - Cooperative cancellation for the whole session
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl ended; per-listing failures and a snapshot
///   write failure that stopped the session are in the report
/// * `Err(RippleError)` - The client or the source could not be set up
pub async fn crawl(
    seeds: Vec<ListingId>,
    config: &Config,
    cancel: CancellationToken,
) -> Result<CrawlReport> {
    let seeds = if seeds.is_empty() {
        parse_seeds(&config.source.seeds)
    } else {
        seeds
    };

    let client = HttpFetchClient::new(Duration::from_secs(config.crawler.request_timeout_secs))?;
    let store = FsSnapshotStore::new(&config.output.raw_root);
    tracing::info!("Writing raw snapshots under {}", store.root().display());

    let mut coordinator = Coordinator::new(config, Arc::new(client), Arc::new(store), cancel)?;
    Ok(coordinator.run(seeds, config.crawler.max_visits).await)
}
