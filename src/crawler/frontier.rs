//! Frontier of listings waiting to be fetched
//!
//! The frontier holds pending listing ids in the order dictated by the
//! session's traversal strategy and refuses ids that are already queued.
//! Whether an id was already fetched is the `VisitedSet`'s business; the
//! coordinator consults both before offering candidates.

use crate::source::ListingId;
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Order in which discovered listings are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalStrategy {
    /// FIFO: every accepted candidate is queued, oldest first
    #[default]
    BreadthFirst,
    /// LIFO: every accepted candidate is queued, newest first
    DepthFirst,
    /// Only the last newly accepted candidate of each response is queued,
    /// producing a single chain through the graph
    Greedy,
}

impl fmt::Display for TraversalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BreadthFirst => "breadth-first",
            Self::DepthFirst => "depth-first",
            Self::Greedy => "greedy",
        };
        f.write_str(name)
    }
}

/// A listing id waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedListing {
    pub listing_id: ListingId,
    /// Hops from the seed that led here (seeds are at depth 0)
    pub depth: u32,
}

/// Pending listing ids for one crawl session
#[derive(Debug, Default)]
pub struct Frontier {
    strategy: TraversalStrategy,
    queue: VecDeque<QueuedListing>,
    queued: HashSet<ListingId>,
}

impl Frontier {
    pub fn new(strategy: TraversalStrategy) -> Self {
        Self {
            strategy,
            queue: VecDeque::new(),
            queued: HashSet::new(),
        }
    }

    pub fn strategy(&self) -> TraversalStrategy {
        self.strategy
    }

    /// Queues a seed id
    ///
    /// Seeds bypass the greedy rule; duplicate seeds are still refused.
    pub fn push_seed(&mut self, listing_id: ListingId) -> bool {
        self.push(QueuedListing {
            listing_id,
            depth: 0,
        })
    }

    /// Queues the newly accepted candidates of one response
    ///
    /// `fresh` must contain only ids that are neither visited nor already
    /// queued, in document order. Returns how many ids were queued.
    pub fn offer(&mut self, fresh: Vec<ListingId>, depth: u32) -> usize {
        let selected: Vec<ListingId> = match self.strategy {
            TraversalStrategy::Greedy => fresh.into_iter().last().into_iter().collect(),
            TraversalStrategy::BreadthFirst | TraversalStrategy::DepthFirst => fresh,
        };

        selected
            .into_iter()
            .filter(|listing_id| {
                self.push(QueuedListing {
                    listing_id: listing_id.clone(),
                    depth,
                })
            })
            .count()
    }

    /// Pops the next id to fetch
    pub fn pop(&mut self) -> Option<QueuedListing> {
        let next = match self.strategy {
            TraversalStrategy::DepthFirst => self.queue.pop_back(),
            TraversalStrategy::BreadthFirst | TraversalStrategy::Greedy => self.queue.pop_front(),
        }?;
        self.queued.remove(&next.listing_id);
        Some(next)
    }

    pub fn contains(&self, listing_id: &ListingId) -> bool {
        self.queued.contains(listing_id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn push(&mut self, entry: QueuedListing) -> bool {
        if !self.queued.insert(entry.listing_id.clone()) {
            return false;
        }
        self.queue.push_back(entry);
        true
    }
}
