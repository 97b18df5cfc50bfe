//! Storage traits and error types
//!
//! This module defines the trait interface for snapshot stores and
//! associated error types.

use crate::storage::{RawEnvelope, SnapshotFilter, SnapshotLocation};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Snapshot already exists: {0}")]
    AlreadyExists(String),

    #[error("Snapshot not found: {0}")]
    NotFound(String),

    #[error("Snapshot is not valid UTF-8: {0}")]
    InvalidEncoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for raw snapshot store implementations
///
/// Snapshots are immutable: `put` never overwrites, and a later snapshot
/// for the same listing is stored alongside the earlier ones.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persists one envelope atomically
    ///
    /// # Returns
    ///
    /// * `Ok(SnapshotLocation)` - Where the envelope can be read back from
    /// * `Err(StorageError::AlreadyExists)` - A snapshot with the same
    ///   `(source, listing_id, retrieved_at)` is already stored
    async fn put(&self, envelope: &RawEnvelope) -> StorageResult<SnapshotLocation>;

    /// Lists stored snapshots matching `filter`, sorted by
    /// `(retrieved_at, source, listing_id)`
    async fn list(&self, filter: &SnapshotFilter) -> StorageResult<Vec<SnapshotLocation>>;

    /// Reads one snapshot back
    async fn get(&self, location: &SnapshotLocation) -> StorageResult<RawEnvelope>;
}
