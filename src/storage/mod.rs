//! Storage module for persisting raw snapshots
//!
//! This module handles the durable capture of every successful response:
//! - The `RawEnvelope` written once per fetch, never modified afterwards
//! - Snapshot locations keyed by `(retrieved_at, source, listing_id)`
//! - A file-system store and an in-memory store behind one trait

mod fs;
mod memory;
mod traits;

pub use fs::FsSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use traits::{SnapshotStore, StorageError, StorageResult};

use crate::source::{ListingId, Source};
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use std::fmt;

/// File-name timestamp: UTC with millisecond precision
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

/// One raw response exactly as it was received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEnvelope {
    pub listing_id: ListingId,
    pub source: Source,
    pub retrieved_at: DateTime<Utc>,
    pub raw_body: String,
}

impl RawEnvelope {
    /// Wraps a body retrieved now
    ///
    /// The timestamp is truncated to milliseconds so it survives a trip
    /// through the snapshot file name unchanged.
    pub fn new(listing_id: ListingId, source: Source, raw_body: String) -> Self {
        Self::at(listing_id, source, Utc::now(), raw_body)
    }

    pub fn at(
        listing_id: ListingId,
        source: Source,
        retrieved_at: DateTime<Utc>,
        raw_body: String,
    ) -> Self {
        Self {
            listing_id,
            source,
            retrieved_at: retrieved_at.trunc_subsecs(3),
            raw_body,
        }
    }

    pub fn location(&self) -> SnapshotLocation {
        SnapshotLocation {
            retrieved_at: self.retrieved_at,
            source: self.source,
            listing_id: self.listing_id.clone(),
        }
    }
}

/// Identity of a stored snapshot
///
/// Field order matters: the derived ordering sorts by retrieval time,
/// then source, then listing id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotLocation {
    pub retrieved_at: DateTime<Utc>,
    pub source: Source,
    pub listing_id: ListingId,
}

impl SnapshotLocation {
    /// `{source}_{listing_id}_{timestamp}.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.json",
            self.source,
            self.listing_id,
            self.retrieved_at.format(TIMESTAMP_FORMAT)
        )
    }

    /// Parses a snapshot file name back into its location
    ///
    /// Listing ids may contain `_`, so the source is split off the front
    /// and the timestamp off the back.
    pub fn parse_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        let (source, rest) = stem.split_once('_')?;
        let (listing_id, stamp) = rest.rsplit_once('_')?;

        let source: Source = source.parse().ok()?;
        let listing_id = ListingId::new(listing_id)?;
        let retrieved_at = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .ok()?
            .and_utc();

        Some(Self {
            retrieved_at,
            source,
            listing_id,
        })
    }
}

impl fmt::Display for SnapshotLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.file_name())
    }
}

/// Selects which snapshots `list` returns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    pub source: Option<Source>,
    /// Only snapshots retrieved at or after this instant
    pub since: Option<DateTime<Utc>>,
}

impl SnapshotFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn source(source: Source) -> Self {
        Self {
            source: Some(source),
            since: None,
        }
    }

    pub fn matches(&self, location: &SnapshotLocation) -> bool {
        self.source.map_or(true, |s| s == location.source)
            && self.since.map_or(true, |t| location.retrieved_at >= t)
    }
}
