//! Blob storage for stowage.
//!
//! This module provides the durable byte sink:
//! - Storage names derived from the declared filename plus a UUID token
//! - A minimal [`BlobStore`] capability (ensure root, create, open, remove, list)
//! - A local filesystem implementation on top of `tokio::fs`

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

use crate::Result;

/// Owned reader over a stored blob. Dropping it closes the blob.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Owned writer into a new blob.
pub type BlobWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A blob found in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    /// Path as stored in file metadata.
    pub path: String,
    /// Last modification time.
    pub modified: SystemTime,
}

/// Durable byte sink.
///
/// Any backend that can create, open, and remove named blobs under a root
/// can stand in for the local filesystem.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Make sure the storage root exists. Safe to call concurrently.
    async fn ensure_root(&self) -> Result<()>;

    /// Create a new blob named `name`. Fails if it already exists.
    ///
    /// Returns the blob's path and a writer positioned at its start.
    async fn create(&self, name: &str) -> Result<(String, BlobWriter)>;

    /// Open the blob at `path` for reading. `None` if it does not exist.
    async fn open(&self, path: &str) -> Result<Option<BlobReader>>;

    /// Remove the blob at `path`. Returns false if it did not exist.
    async fn remove(&self, path: &str) -> Result<bool>;

    /// Every blob under the root.
    async fn list(&self) -> Result<Vec<BlobEntry>>;
}

/// Derive a collision-resistant storage name from a declared filename.
///
/// The token goes between base and extension so the extension survives:
/// `report.pdf` becomes `report_<uuid>.pdf` and `README` becomes
/// `README_<uuid>`. Directory components are dropped, and a leading dot
/// does not start an extension.
pub fn storage_name(declared: &str) -> String {
    let token = Uuid::new_v4();
    let name = match declared.rsplit(['/', '\\']).next() {
        Some(n) if !n.is_empty() && n != "." && n != ".." => n,
        _ => "file",
    };

    match name.rfind('.') {
        Some(dot) if dot > 0 => {
            let (base, ext) = name.split_at(dot);
            format!("{base}_{token}{ext}")
        }
        _ => format!("{name}_{token}"),
    }
}

/// Blob store backed by a local directory.
///
/// Blobs live directly under the root, one file per storage name:
/// ```text
/// {root}/
/// ├── report_2f1c...-....pdf
/// └── README_9ab0...-...
/// ```
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, name: &str) -> String {
        self.root.join(name).to_string_lossy().into_owned()
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn create(&self, name: &str) -> Result<(String, BlobWriter)> {
        let path = self.blob_path(name);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        Ok((path, Box::new(file)))
    }

    async fn open(&self, path: &str) -> Result<Option<BlobReader>> {
        match fs::File::open(path).await {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, path: &str) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<BlobEntry>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut blobs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            blobs.push(BlobEntry {
                path: entry.path().to_string_lossy().into_owned(),
                modified: metadata.modified()?,
            });
        }
        Ok(blobs)
    }
}
