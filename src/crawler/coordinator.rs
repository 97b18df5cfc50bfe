//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! a session, including:
//! - Seeding and draining the frontier
//! - Pacing, fetching and retrying one listing at a time
//! - Persisting every accepted response before looking inside it
//! - Filtering and enqueueing recommended listings
//! - Stopping on an empty frontier, the visit budget, or cancellation

use crate::config::Config;
use crate::crawler::fetcher::{check_status, FetchClient, FetchError};
use crate::crawler::frontier::{Frontier, QueuedListing, TraversalStrategy};
use crate::crawler::pacer::{wait_or_cancel, JitterPacer, Pacer};
use crate::crawler::parser::extract_candidates;
use crate::crawler::retry::RetryPolicy;
use crate::filter::CategoryFilter;
use crate::source::{ListingId, Source, SourceApi};
use crate::state::{NodeState, VisitedSet};
use crate::storage::{RawEnvelope, SnapshotStore};
use crate::Result;
use serde::de::IgnoredAny;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// A listing whose fetch did not produce a stored snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedNode {
    pub listing_id: ListingId,
    pub state: NodeState,
    /// Fetch attempts made, including the first
    pub attempts: u32,
    pub error: String,
}

/// Outcome of a crawl session
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub source: Source,
    pub strategy: TraversalStrategy,
    /// Listings fetched (each counted once, however many attempts it took)
    pub visited: usize,
    /// Listings whose response was persisted
    pub stored: usize,
    /// Ids not fetched because they were already visited or queued
    pub skipped_duplicate: usize,
    /// Candidates refused by the category filter
    pub skipped_by_category: usize,
    pub failed: usize,
    /// Extra attempts spent on retryable failures
    pub retries: usize,
    pub enqueued: usize,
    /// Ids still waiting when the session ended
    pub remaining: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
    /// Set when a snapshot could not be persisted; the session stopped there
    pub aborted: Option<String>,
    pub config_hash: Option<String>,
    pub failures: Vec<FailedNode>,
}

impl CrawlReport {
    /// Percentage of visited listings that were stored
    pub fn success_rate(&self) -> f64 {
        if self.visited == 0 {
            0.0
        } else {
            self.stored as f64 / self.visited as f64 * 100.0
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    visited: usize,
    stored: usize,
    skipped_duplicate: usize,
    skipped_by_category: usize,
    retries: usize,
    enqueued: usize,
    failures: Vec<FailedNode>,
}

enum Visit {
    Stored,
    Failed,
    Cancelled,
}

/// One crawl session
///
/// The session owns its frontier and visited set; nothing is shared with
/// other sessions, and a new session starts from an empty visited set.
pub struct Coordinator {
    api: SourceApi,
    client: Arc<dyn FetchClient>,
    store: Arc<dyn SnapshotStore>,
    pacer: Box<dyn Pacer>,
    retry: RetryPolicy,
    filter: CategoryFilter,
    frontier: Frontier,
    visited: VisitedSet,
    cancel: CancellationToken,
    config_hash: Option<String>,
    counters: Counters,
}

impl Coordinator {
    /// Creates a new session from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `client` - The fetch client used for every request
    /// * `store` - Where raw snapshots are persisted
    /// * `cancel` - Token observed at every suspension point
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created session
    /// * `Err(RippleError)` - The source configuration is unusable
    pub fn new(
        config: &Config,
        client: Arc<dyn FetchClient>,
        store: Arc<dyn SnapshotStore>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        Ok(Self {
            api: SourceApi::from_config(&config.source)?,
            client,
            store,
            pacer: Box::new(JitterPacer::from_config(&config.pacer)),
            retry: RetryPolicy::from_config(&config.crawler),
            filter: CategoryFilter::from_config(&config.filter),
            frontier: Frontier::new(config.crawler.strategy),
            visited: VisitedSet::new(),
            cancel,
            config_hash: None,
            counters: Counters::default(),
        })
    }

    pub fn with_pacer(mut self, pacer: impl Pacer + 'static) -> Self {
        self.pacer = Box::new(pacer);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Runs the main crawl loop
    ///
    /// # Arguments
    ///
    /// * `seeds` - Listing ids to start from
    /// * `max_visits` - Stop after this many listings were fetched
    ///
    /// # Returns
    ///
    /// The report of the session, whichever way it ended: empty frontier,
    /// visit budget, cancellation, or a snapshot write failure (recorded in
    /// `aborted`). Node failures are listed, never returned as errors.
    pub async fn run(&mut self, seeds: Vec<ListingId>, max_visits: Option<u32>) -> CrawlReport {
        let started = Instant::now();
        tracing::info!(
            "Starting {} crawl ({}) with {} seeds",
            self.api.source(),
            self.frontier.strategy(),
            seeds.len()
        );

        for seed in seeds {
            if !self.frontier.push_seed(seed.clone()) {
                tracing::debug!("Ignoring repeated seed {}", seed);
            }
        }

        let mut cancelled = false;
        let mut aborted = None;
        loop {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            if let Some(max) = max_visits {
                if self.counters.visited >= max as usize {
                    tracing::info!("Visit budget of {} reached", max);
                    break;
                }
            }

            let Some(node) = self.frontier.pop() else {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            };

            if !self.visited.mark_fetching(&node.listing_id) {
                tracing::debug!("Skipping {}: already visited", node.listing_id);
                self.counters.skipped_duplicate += 1;
                continue;
            }
            self.counters.visited += 1;

            match self.visit(&node).await {
                Ok(Visit::Stored | Visit::Failed) => {}
                Ok(Visit::Cancelled) => {
                    cancelled = true;
                    break;
                }
                Err(e) => {
                    tracing::error!("Stopping crawl: could not persist {}: {}", node.listing_id, e);
                    aborted = Some(e.to_string());
                    break;
                }
            }

            if self.counters.visited % 10 == 0 {
                let minutes = started.elapsed().as_secs_f64() / 60.0;
                let rate = if minutes > 0.0 {
                    self.counters.visited as f64 / minutes
                } else {
                    0.0
                };
                tracing::info!(
                    "Progress: {} listings visited, {} stored, {} in frontier, {:.1} listings/min",
                    self.counters.visited,
                    self.counters.stored,
                    self.frontier.len(),
                    rate
                );
            }
        }

        if cancelled {
            tracing::warn!(
                "Crawl cancelled with {} listings still queued",
                self.frontier.len()
            );
        }

        let counters = std::mem::take(&mut self.counters);
        let report = CrawlReport {
            source: self.api.source(),
            strategy: self.frontier.strategy(),
            visited: counters.visited,
            stored: counters.stored,
            skipped_duplicate: counters.skipped_duplicate,
            skipped_by_category: counters.skipped_by_category,
            failed: counters.failures.len(),
            retries: counters.retries,
            enqueued: counters.enqueued,
            remaining: self.frontier.len(),
            elapsed: started.elapsed(),
            cancelled,
            aborted,
            config_hash: self.config_hash.clone(),
            failures: counters.failures,
        };

        tracing::info!(
            "Crawl finished: {} visited, {} stored, {} failed, {} skipped by category, {} duplicates",
            report.visited,
            report.stored,
            report.failed,
            report.skipped_by_category,
            report.skipped_duplicate
        );

        report
    }

    /// Fetches, persists and expands one listing
    async fn visit(&mut self, node: &QueuedListing) -> Result<Visit> {
        let listing_id = &node.listing_id;
        let body = match self.fetch_with_retry(listing_id).await {
            FetchOutcome::Body(body) => body,
            FetchOutcome::Cancelled => return Ok(Visit::Cancelled),
            FetchOutcome::Failed { error, attempts } => {
                let state = if error.is_retryable() {
                    NodeState::FailedRetryable
                } else {
                    NodeState::FailedTerminal
                };
                tracing::warn!(
                    "Giving up on {} after {} attempt(s): {}",
                    listing_id,
                    attempts,
                    error
                );
                self.visited.set_state(listing_id, state);
                self.counters.failures.push(FailedNode {
                    listing_id: listing_id.clone(),
                    state,
                    attempts,
                    error: error.to_string(),
                });
                return Ok(Visit::Failed);
            }
        };

        // Persisted before extraction; a store failure ends the session
        let envelope = RawEnvelope::new(listing_id.clone(), self.api.source(), body);
        let location = self.store.put(&envelope).await?;
        self.visited.set_state(listing_id, NodeState::Stored);
        self.counters.stored += 1;
        tracing::debug!("Stored {} as {}", listing_id, location);

        let candidates = match extract_candidates(envelope.source, &envelope.raw_body) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("Stored {} but could not read recommendations: {}", listing_id, e);
                return Ok(Visit::Stored);
            }
        };

        let mut fresh = Vec::new();
        let mut seen_here = HashSet::new();
        for candidate in candidates {
            if !self.filter.accept(&candidate) {
                tracing::trace!(
                    "Category filter refused {} (category {:?}, gallery {:?})",
                    candidate.listing_id,
                    candidate.category_code,
                    candidate.gallery_title
                );
                self.counters.skipped_by_category += 1;
                continue;
            }

            if self.visited.contains(&candidate.listing_id)
                || self.frontier.contains(&candidate.listing_id)
                || !seen_here.insert(candidate.listing_id.clone())
            {
                self.counters.skipped_duplicate += 1;
                continue;
            }

            tracing::trace!(
                "Accepted {}: {} ({})",
                candidate.listing_id,
                candidate.subject.as_deref().unwrap_or("untitled"),
                candidate.price_text.as_deref().unwrap_or("no price")
            );
            fresh.push(candidate.listing_id);
        }

        let accepted = fresh.len();
        let enqueued = self.frontier.offer(fresh, node.depth + 1);
        self.counters.enqueued += enqueued;
        tracing::debug!(
            "{} (depth {}): {} new candidates, {} enqueued",
            listing_id,
            node.depth,
            accepted,
            enqueued
        );

        Ok(Visit::Stored)
    }

    /// Paces and fetches one listing, retrying retryable failures
    async fn fetch_with_retry(&mut self, listing_id: &ListingId) -> FetchOutcome {
        let request = self.api.request_for(listing_id);
        let mut retry = 0u32;

        loop {
            // The pacer floor holds for retries too
            let paced = self.pacer.next_delay();
            let delay = if retry == 0 {
                paced
            } else {
                paced.max(self.retry.delay_for(retry))
            };
            if !wait_or_cancel(delay, &self.cancel).await {
                return FetchOutcome::Cancelled;
            }

            let response = tokio::select! {
                _ = self.cancel.cancelled() => return FetchOutcome::Cancelled,
                response = self.client.fetch(&request) => response,
            };

            let result = response
                .map_err(FetchError::from)
                .and_then(check_status)
                .and_then(|body| match serde_json::from_str::<IgnoredAny>(&body) {
                    Ok(_) => Ok(body),
                    Err(e) => Err(FetchError::Malformed(e.to_string())),
                });

            match result {
                Ok(body) => return FetchOutcome::Body(body),
                Err(error) if error.is_retryable() && self.retry.should_retry(retry + 1) => {
                    retry += 1;
                    self.counters.retries += 1;
                    tracing::warn!(
                        "Fetch of {} failed ({}), retry {}/{}",
                        listing_id,
                        error,
                        retry,
                        self.retry.max_retries
                    );
                }
                Err(error) => {
                    return FetchOutcome::Failed {
                        error,
                        attempts: retry + 1,
                    }
                }
            }
        }
    }
}

enum FetchOutcome {
    Body(String),
    Failed { error: FetchError, attempts: u32 },
    Cancelled,
}

/// Parses configured seed strings into listing ids
///
/// Invalid seeds are skipped with a warning; validation normally rejects
/// them before a session starts.
pub fn parse_seeds<S: AsRef<str>>(raw: &[S]) -> Vec<ListingId> {
    raw.iter()
        .filter_map(|s| {
            let parsed = ListingId::new(s.as_ref());
            if parsed.is_none() {
                tracing::warn!("Ignoring invalid seed {:?}", s.as_ref());
            }
            parsed
        })
        .collect()
}
