//! Database schema and migrations for stowage.
//!
//! Migrations are applied in order; the `schema_version` table records
//! which ones have already run.

/// Bookkeeping table for applied migrations.
#[cfg(feature = "sqlite")]
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
)
"#;

/// Bookkeeping table for applied migrations.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version     BIGINT PRIMARY KEY,
    applied_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Database migrations.
#[cfg(feature = "sqlite")]
pub const MIGRATIONS: &[&str] = &[
    // v1: files table
    r#"
-- seq orders rows that share a created_at timestamp
CREATE TABLE files (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    id          TEXT NOT NULL UNIQUE,
    filename    TEXT NOT NULL UNIQUE,
    size        INTEGER NOT NULL,
    path        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX idx_files_created_at ON files(created_at);
"#,
];

/// Database migrations.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub const MIGRATIONS: &[&str] = &[
    // v1: files table
    r#"
CREATE TABLE files (
    seq         BIGSERIAL PRIMARY KEY,
    id          TEXT NOT NULL UNIQUE,
    filename    TEXT NOT NULL UNIQUE,
    size        BIGINT NOT NULL,
    path        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX idx_files_created_at ON files(created_at);
"#,
];
