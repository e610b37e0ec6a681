//! File service for stowage.
//!
//! This module provides the high-level file operations:
//! - Upload: write the blob, then register its metadata
//! - Resolve: find a file by name and open its bytes
//! - List: paginate over registered files
//! - Orphan reconciliation for blobs left behind by a crash

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::metadata::{FileListing, MetadataStore, Pagination, StoredFile};
use super::storage::{storage_name, BlobReader, BlobStore, BlobWriter};
use crate::{Result, StowageError};

/// Coordinates the metadata store and the blob store.
///
/// Cheap to clone; every clone shares the same stores.
#[derive(Clone)]
pub struct FileService {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
}

impl FileService {
    /// Create a new FileService.
    pub fn new(metadata: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { metadata, blobs }
    }

    /// Store the bytes of `source` under a fresh name derived from `declared`.
    ///
    /// The blob is written in full before any metadata exists, so a file
    /// is never listed before its bytes are durable. If writing or
    /// registering fails the partial blob is removed.
    pub async fn upload<R>(&self, declared: &str, mut source: R) -> Result<StoredFile>
    where
        R: AsyncRead + Unpin + Send,
    {
        let name = storage_name(declared);
        self.blobs.ensure_root().await?;
        let (path, mut writer) = self.blobs.create(&name).await?;
        let pending = PendingBlob::new(Arc::clone(&self.blobs), path.clone());

        let written = write_blob(&mut source, &mut writer).await;
        drop(writer);
        let size = match written {
            Ok(size) => size,
            Err(e) => {
                pending.discard().await;
                return Err(e);
            }
        };

        let now = Utc::now();
        let file = StoredFile {
            id: Uuid::new_v4().to_string(),
            filename: name,
            size: size as i64,
            path,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.metadata.save(&file).await {
            pending.discard().await;
            return Err(e);
        }
        pending.commit();

        info!(
            filename = %file.filename,
            declared = %declared,
            size = file.size,
            "File stored"
        );
        Ok(file)
    }

    /// Find `filename` and open its bytes.
    ///
    /// Returns `NotFound` when no metadata exists. A record whose blob is
    /// gone is an internal inconsistency, not a missing file.
    pub async fn resolve(&self, filename: &str) -> Result<(StoredFile, BlobReader)> {
        let file = self
            .metadata
            .get_by_filename(filename)
            .await?
            .ok_or_else(|| StowageError::NotFound(format!("file '{filename}'")))?;

        match self.blobs.open(&file.path).await? {
            Some(reader) => Ok((file, reader)),
            None => {
                error!(
                    filename = %file.filename,
                    path = %file.path,
                    "Metadata exists but blob is missing"
                );
                Err(StowageError::Inconsistent(format!(
                    "blob for '{}' is missing",
                    file.filename
                )))
            }
        }
    }

    /// One page of files, newest first.
    pub async fn list(&self, pagination: Pagination) -> Result<FileListing> {
        let (files, total) = self
            .metadata
            .list(pagination.offset(), pagination.limit())
            .await?;
        Ok(FileListing {
            files: files.into_iter().map(Into::into).collect(),
            total,
        })
    }

    /// Remove blobs that no metadata record refers to.
    ///
    /// Blobs are matched to records by storage name, so a root spelled
    /// differently than at upload time still matches. Blobs modified within
    /// `grace` are skipped because an upload may still be registering them.
    /// Returns the number of blobs removed.
    pub async fn reconcile_orphans(&self, grace: Duration) -> Result<usize> {
        let paths = self.metadata.list_paths().await?;
        let known: HashSet<&str> = paths.iter().filter_map(|p| blob_name(p)).collect();
        let cutoff = SystemTime::now().checked_sub(grace);
        let mut removed = 0;

        for blob in self.blobs.list().await? {
            match blob_name(&blob.path) {
                Some(name) if !known.contains(name) => {}
                _ => continue,
            }
            let old_enough = match cutoff {
                Some(cutoff) => blob.modified <= cutoff,
                None => false,
            };
            if !old_enough {
                continue;
            }
            match self.blobs.remove(&blob.path).await {
                Ok(true) => {
                    info!(path = %blob.path, "Removed orphaned blob");
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => warn!(path = %blob.path, error = %e, "Failed to remove orphaned blob"),
            }
        }

        Ok(removed)
    }
}

/// Storage name of the blob at `path`.
fn blob_name(path: &str) -> Option<&str> {
    Path::new(path).file_name().and_then(|n| n.to_str())
}

async fn write_blob<R>(source: &mut R, writer: &mut BlobWriter) -> Result<u64>
where
    R: AsyncRead + Unpin + Send,
{
    let size = tokio::io::copy(source, writer).await?;
    writer.shutdown().await?;
    Ok(size)
}

async fn remove_best_effort(blobs: &dyn BlobStore, path: &str) {
    if let Err(e) = blobs.remove(path).await {
        warn!(path = %path, error = %e, "Failed to remove partial blob");
    }
}

/// A blob that exists on disk but is not yet registered.
///
/// Unless committed, the blob is removed: awaited on [`discard`](Self::discard),
/// or on a spawned task if the guard is dropped because the upload was cancelled.
struct PendingBlob {
    blobs: Arc<dyn BlobStore>,
    path: Option<String>,
}

impl PendingBlob {
    fn new(blobs: Arc<dyn BlobStore>, path: String) -> Self {
        Self {
            blobs,
            path: Some(path),
        }
    }

    fn commit(mut self) {
        self.path = None;
    }

    async fn discard(mut self) {
        if let Some(path) = self.path.take() {
            remove_best_effort(self.blobs.as_ref(), &path).await;
        }
    }
}

impl Drop for PendingBlob {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let blobs = Arc::clone(&self.blobs);
                handle.spawn(async move {
                    remove_best_effort(blobs.as_ref(), &path).await;
                });
            }
            Err(_) => warn!(path = %path, "Abandoned partial blob outside a runtime"),
        }
    }
}
