//! File-system snapshot store
//!
//! Layout: `{root}/{source}/{source}_{listing_id}_{timestamp}.json`, one
//! file per envelope holding the verbatim response body.

use crate::source::Source;
use crate::storage::{
    RawEnvelope, SnapshotFilter, SnapshotLocation, SnapshotStore, StorageError, StorageResult,
};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Snapshot store rooted at a directory
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    root: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a snapshot
    pub fn path_for(&self, location: &SnapshotLocation) -> PathBuf {
        self.root
            .join(location.source.as_str())
            .join(location.file_name())
    }

    async fn list_source(
        &self,
        source: Source,
        filter: &SnapshotFilter,
        out: &mut Vec<SnapshotLocation>,
    ) -> StorageResult<()> {
        let dir = self.root.join(source.as_str());
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                tracing::debug!("Ignoring non UTF-8 file name in {}", dir.display());
                continue;
            };

            match SnapshotLocation::parse_file_name(name) {
                Some(location) if location.source == source => {
                    if filter.matches(&location) {
                        out.push(location);
                    }
                }
                _ => {
                    tracing::debug!("Ignoring unrecognised file {}/{}", dir.display(), name);
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    /// Writes to a temp file, then links it into place
    ///
    /// Linking fails when the target exists, so a colliding write surfaces
    /// as `AlreadyExists` and the earlier snapshot is left untouched.
    async fn put(&self, envelope: &RawEnvelope) -> StorageResult<SnapshotLocation> {
        let location = envelope.location();
        let final_path = self.path_for(&location);
        let dir = self.root.join(location.source.as_str());
        fs::create_dir_all(&dir).await?;

        let temp_path = dir.join(format!(
            ".{}.{}.tmp",
            uuid::Uuid::new_v4(),
            envelope.raw_body.len()
        ));

        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await?;
        let written = async {
            file.write_all(envelope.raw_body.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        let linked = fs::hard_link(&temp_path, &final_path).await;
        let _ = fs::remove_file(&temp_path).await;

        match linked {
            Ok(()) => {
                tracing::debug!("Stored snapshot {}", final_path.display());
                Ok(location)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(location.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, filter: &SnapshotFilter) -> StorageResult<Vec<SnapshotLocation>> {
        let mut locations = Vec::new();
        for source in Source::all() {
            if filter.source.map_or(true, |s| s == source) {
                self.list_source(source, filter, &mut locations).await?;
            }
        }
        locations.sort();
        Ok(locations)
    }

    async fn get(&self, location: &SnapshotLocation) -> StorageResult<RawEnvelope> {
        let path = self.path_for(location);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(location.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let raw_body = String::from_utf8(bytes)
            .map_err(|_| StorageError::InvalidEncoding(location.to_string()))?;

        Ok(RawEnvelope {
            listing_id: location.listing_id.clone(),
            source: location.source,
            retrieved_at: location.retrieved_at,
            raw_body,
        })
    }
}
