//! Deduplication of normalized listings
//!
//! Many snapshots mention the same listing. The aggregate keeps one record
//! per `(source, listing id)`: the one with the latest `listed_at`, then the latest
//! `retrieved_at`, and on an exact tie the one that came later in the input.

use crate::processing::NormalizedListing;
use crate::source::{ListingId, Source};
use serde::Deserialize;
use std::collections::HashMap;

/// Optional ordering of the final dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    ListingId,
    ListedAt,
    /// Ascending, listings without a price last
    Price,
}

/// Result of collapsing duplicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateOutcome {
    pub listings: Vec<NormalizedListing>,
    /// Records discarded because another record for the same id won
    pub duplicates: usize,
}

/// Collapses listings to one record per source and listing id
///
/// Without a sort key, output follows the order in which each id first
/// appeared in the input.
pub fn aggregate<I>(listings: I, sort: Option<SortKey>) -> AggregateOutcome
where
    I: IntoIterator<Item = NormalizedListing>,
{
    let mut slots: Vec<NormalizedListing> = Vec::new();
    let mut index: HashMap<(Source, ListingId), usize> = HashMap::new();
    let mut duplicates = 0;

    for listing in listings {
        let key = (listing.source, listing.listing_id.clone());
        match index.get(&key) {
            Some(&slot) => {
                duplicates += 1;
                let current = &slots[slot];
                if (listing.listed_at, listing.retrieved_at)
                    >= (current.listed_at, current.retrieved_at)
                {
                    slots[slot] = listing;
                }
            }
            None => {
                index.insert(key, slots.len());
                slots.push(listing);
            }
        }
    }

    if let Some(key) = sort {
        sort_listings(&mut slots, key);
    }

    AggregateOutcome {
        listings: slots,
        duplicates,
    }
}

fn sort_listings(listings: &mut [NormalizedListing], key: SortKey) {
    match key {
        SortKey::ListingId => listings.sort_by(|a, b| a.listing_id.cmp(&b.listing_id)),
        SortKey::ListedAt => listings.sort_by(|a, b| a.listed_at.cmp(&b.listed_at)),
        SortKey::Price => listings.sort_by(|a, b| match (a.price, b.price) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }),
    }
}
