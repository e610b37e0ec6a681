//! File metadata types and the metadata store.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use super::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::db::DbPool;
use crate::{Result, StowageError};

/// One persisted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Unique file ID (UUID v4).
    pub id: String,
    /// Storage name under which the file is addressable.
    pub filename: String,
    /// Number of bytes written to `path`.
    pub size: i64,
    /// Location of the bytes in the blob store.
    pub path: String,
    /// When the file was stored.
    pub created_at: DateTime<Utc>,
    /// Last metadata change.
    pub updated_at: DateTime<Utc>,
}

/// Public view of a stored file; omits `id` and `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub filename: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredFile> for FileSummary {
    fn from(file: StoredFile) -> Self {
        Self {
            filename: file.filename,
            size: file.size,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

/// One page of files, newest first, with the total number of files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    pub files: Vec<FileSummary>,
    pub total: i64,
}

/// Normalized page window.
///
/// Page `0` or unset means page 1. A page size that is unset, `0`, or
/// above [`MAX_PAGE_SIZE`] means [`DEFAULT_PAGE_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    page_size: u32,
}

impl Pagination {
    /// Build a window from raw request values.
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        let page = match page {
            None | Some(0) => 1,
            Some(p) => p,
        };
        let page_size = match page_size {
            Some(size) if (1..=MAX_PAGE_SIZE).contains(&size) => size,
            _ => DEFAULT_PAGE_SIZE,
        };
        Self { page, page_size }
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Rows to skip.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }

    /// Rows to return.
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Durable record of stored files.
///
/// Implementations must be safe for concurrent reads and writes.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Register a new file.
    async fn save(&self, file: &StoredFile) -> Result<()>;

    /// Look up a file by its storage name.
    async fn get_by_filename(&self, filename: &str) -> Result<Option<StoredFile>>;

    /// Return `limit` files starting at `offset`, newest first, plus the total count.
    async fn list(&self, offset: i64, limit: i64) -> Result<(Vec<StoredFile>, i64)>;

    /// Overwrite the record with `file.id`. Returns false if no such record exists.
    async fn update(&self, file: &StoredFile) -> Result<bool>;

    /// Delete the record with `id`. Returns false if no such record exists.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Every registered blob path.
    async fn list_paths(&self) -> Result<HashSet<String>>;
}

/// Raw database row; timestamps are stored as RFC 3339 text.
#[derive(Debug, sqlx::FromRow)]
struct FileRow {
    id: String,
    filename: String,
    size: i64,
    path: String,
    created_at: String,
    updated_at: String,
}

impl FileRow {
    fn into_stored_file(self) -> Result<StoredFile> {
        Ok(StoredFile {
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            id: self.id,
            filename: self.filename,
            size: self.size,
            path: self.path,
        })
    }
}

/// Microsecond precision with a `Z` suffix keeps lexical and chronological order equal.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StowageError::Database(format!("invalid timestamp {s:?}: {e}")))
}

/// SQL-backed metadata store.
#[derive(Clone)]
pub struct FileRepository {
    pool: DbPool,
}

impl FileRepository {
    /// Create a new FileRepository over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for FileRepository {
    async fn save(&self, file: &StoredFile) -> Result<()> {
        sqlx::query(
            "INSERT INTO files (id, filename, size, path, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&file.id)
        .bind(&file.filename)
        .bind(file.size)
        .bind(&file.path)
        .bind(format_timestamp(&file.created_at))
        .bind(format_timestamp(&file.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_filename(&self, filename: &str) -> Result<Option<StoredFile>> {
        let row: Option<FileRow> = sqlx::query_as(
            "SELECT id, filename, size, path, created_at, updated_at
             FROM files WHERE filename = $1",
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileRow::into_stored_file).transpose()
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<(Vec<StoredFile>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<FileRow> = sqlx::query_as(
            "SELECT id, filename, size, path, created_at, updated_at
             FROM files ORDER BY created_at DESC, seq DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let files = rows
            .into_iter()
            .map(FileRow::into_stored_file)
            .collect::<Result<Vec<_>>>()?;
        Ok((files, total))
    }

    async fn update(&self, file: &StoredFile) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET filename = $1, size = $2, path = $3, updated_at = $4
             WHERE id = $5",
        )
        .bind(&file.filename)
        .bind(file.size)
        .bind(&file.path)
        .bind(format_timestamp(&file.updated_at))
        .bind(&file.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_paths(&self) -> Result<HashSet<String>> {
        let paths: Vec<String> = sqlx::query_scalar("SELECT path FROM files")
            .fetch_all(&self.pool)
            .await?;
        Ok(paths.into_iter().collect())
    }
}
