//! Response DTOs.

use serde::{Deserialize, Serialize};

use crate::file::{FileListing, FileSummary, StoredFile};

/// Result of a successful upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// File ID.
    pub id: String,
    /// Storage name; use it to download the file.
    pub filename: String,
    /// Bytes stored.
    pub size: i64,
}

impl From<StoredFile> for UploadResponse {
    fn from(file: StoredFile) -> Self {
        Self {
            id: file.id,
            filename: file.filename,
            size: file.size,
        }
    }
}

/// One entry of a file listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileItem {
    pub filename: String,
    pub size: i64,
    /// RFC 3339.
    pub created_at: String,
    /// RFC 3339.
    pub updated_at: String,
}

impl From<FileSummary> for FileItem {
    fn from(file: FileSummary) -> Self {
        Self {
            filename: file.filename,
            size: file.size,
            created_at: file.created_at.to_rfc3339(),
            updated_at: file.updated_at.to_rfc3339(),
        }
    }
}

/// A page of files plus the total number stored.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub files: Vec<FileItem>,
    pub total_count: i64,
}

impl From<FileListing> for ListResponse {
    fn from(listing: FileListing) -> Self {
        Self {
            files: listing.files.into_iter().map(Into::into).collect(),
            total_count: listing.total,
        }
    }
}
