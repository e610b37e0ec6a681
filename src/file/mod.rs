//! File storage module for stowage.
//!
//! This module provides:
//! - File metadata records and the SQL-backed metadata store
//! - Blob storage with collision-resistant naming
//! - The file service that keeps metadata and blobs consistent

mod metadata;
mod service;
mod storage;

pub use metadata::{FileListing, FileRepository, FileSummary, MetadataStore, Pagination, StoredFile};
pub use service::FileService;
pub use storage::{storage_name, BlobEntry, BlobReader, BlobStore, BlobWriter, LocalBlobStore};

/// Page size used when a list request gives none or an out-of-range one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a list request may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;
