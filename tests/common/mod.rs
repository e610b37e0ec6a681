//! Test helpers for HTTP integration tests.
//!
//! Provides a TestApp that wires the router to an in-memory database and a
//! temporary blob directory.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::json;
use tempfile::TempDir;

use stowage::admission::{AdmissionController, OperationClass};
use stowage::file::{FileRepository, FileService, LocalBlobStore};
use stowage::web::{create_health_router, create_router, AppState};
use stowage::Database;

/// Upload body limit used by tests.
pub const TEST_MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

/// A running router plus handles on its internals.
pub struct TestApp {
    pub server: TestServer,
    pub admission: AdmissionController,
    pub files: FileService,
    pub db: Database,
    temp_dir: TempDir,
}

impl TestApp {
    /// Create an app with generous limits.
    pub async fn new() -> Self {
        Self::with_capacities(8, 8, 8).await
    }

    /// Create an app with explicit per-class capacities.
    pub async fn with_capacities(upload: usize, download: usize, list: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");

        let files = FileService::new(
            Arc::new(FileRepository::new(db.pool().clone())),
            Arc::new(LocalBlobStore::new(temp_dir.path().join("files"))),
        );
        let admission = AdmissionController::with_capacities(upload, download, list);
        let app_state = Arc::new(AppState::new(files.clone(), admission.clone()));

        let router = create_router(app_state, TEST_MAX_UPLOAD_BYTES).merge(create_health_router());
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            admission,
            files,
            db,
            temp_dir,
        }
    }

    /// Directory holding stored blobs.
    pub fn storage_dir(&self) -> PathBuf {
        self.temp_dir.path().join("files")
    }

    /// Number of blobs on disk.
    pub fn blob_count(&self) -> usize {
        match std::fs::read_dir(self.storage_dir()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    /// Wait until every slot of `class` is free again.
    pub async fn wait_idle(&self, class: OperationClass) {
        for _ in 0..100 {
            if self.admission.available(class) == self.admission.capacity(class) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{class} slots were not released");
    }
}

/// Build an upload form: an info part followed by one chunk part per slice.
pub fn upload_form(filename: &str, content_type: &str, chunks: &[&[u8]]) -> MultipartForm {
    let info = json!({ "filename": filename, "content_type": content_type }).to_string();
    let form = MultipartForm::new().add_part("info", Part::text(info));
    chunks.iter().fold(form, |form, chunk| {
        form.add_part("chunk", Part::bytes(chunk.to_vec()))
    })
}

/// Build an upload form from content split into `chunk_size` pieces.
pub fn chunked_form(filename: &str, content: &[u8], chunk_size: usize) -> MultipartForm {
    let chunks: Vec<&[u8]> = content.chunks(chunk_size).collect();
    upload_form(filename, "application/octet-stream", &chunks)
}
