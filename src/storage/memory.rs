//! In-memory snapshot store

use crate::storage::{
    RawEnvelope, SnapshotFilter, SnapshotLocation, SnapshotStore, StorageError, StorageResult,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Snapshot store that keeps every envelope in a map
///
/// Useful for tests and dry runs; it enforces the same no-overwrite rule
/// as the file-system store.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<BTreeMap<SnapshotLocation, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Every stored envelope in store order
    pub fn envelopes(&self) -> Vec<RawEnvelope> {
        self.lock()
            .iter()
            .map(|(location, body)| RawEnvelope {
                listing_id: location.listing_id.clone(),
                source: location.source,
                retrieved_at: location.retrieved_at,
                raw_body: body.clone(),
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<SnapshotLocation, String>> {
        self.snapshots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn put(&self, envelope: &RawEnvelope) -> StorageResult<SnapshotLocation> {
        let location = envelope.location();
        let mut snapshots = self.lock();
        if snapshots.contains_key(&location) {
            return Err(StorageError::AlreadyExists(location.to_string()));
        }
        snapshots.insert(location.clone(), envelope.raw_body.clone());
        Ok(location)
    }

    async fn list(&self, filter: &SnapshotFilter) -> StorageResult<Vec<SnapshotLocation>> {
        Ok(self
            .lock()
            .keys()
            .filter(|location| filter.matches(location))
            .cloned()
            .collect())
    }

    async fn get(&self, location: &SnapshotLocation) -> StorageResult<RawEnvelope> {
        let snapshots = self.lock();
        let body = snapshots
            .get(location)
            .ok_or_else(|| StorageError::NotFound(location.to_string()))?;
        Ok(RawEnvelope {
            listing_id: location.listing_id.clone(),
            source: location.source,
            retrieved_at: location.retrieved_at,
            raw_body: body.clone(),
        })
    }
}
