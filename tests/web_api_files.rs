//! Web API File Tests
//!
//! Integration tests for upload, download, and listing endpoints.

mod common;

use axum::http::{header, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use serde_json::Value;

use common::{chunked_form, upload_form, TestApp};
use stowage::admission::OperationClass;
use stowage::transfer::CHUNK_SIZE;

const HELLO: &[u8] = b"Hello, this is a test file content!";

/// Upload `content` and return the storage name.
async fn upload(app: &TestApp, filename: &str, content: &[u8]) -> String {
    let response = app
        .server
        .post("/api/files")
        .multipart(chunked_form(filename, content, 10))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["filename"]
        .as_str()
        .unwrap()
        .to_string()
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_download_list_round_trip() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/files")
        .multipart(chunked_form("test.txt", HELLO, 10))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let filename = body["filename"].as_str().unwrap().to_string();
    assert_eq!(body["size"], HELLO.len() as i64);
    assert!(filename.starts_with("test_"));
    assert!(filename.ends_with(".txt"));
    assert!(!body["id"].as_str().unwrap().is_empty());

    let response = app.server.get(&format!("/api/files/{filename}")).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), HELLO);
    assert!(response
        .header(header::CONTENT_TYPE)
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let response = app.server.get("/api/files?page=1&page_size=10").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total_count"], 1);
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["filename"], filename.as_str());
    assert_eq!(files[0]["size"], HELLO.len() as i64);
    assert!(files[0]["created_at"].as_str().is_some());
    assert!(files[0]["updated_at"].as_str().is_some());
}

#[tokio::test]
async fn test_upload_same_name_twice_keeps_both() {
    let app = TestApp::new().await;

    let first = upload(&app, "dup.txt", b"first").await;
    let second = upload(&app, "dup.txt", b"second").await;

    assert_ne!(first, second);
    let response = app.server.get(&format!("/api/files/{first}")).await;
    assert_eq!(response.as_bytes().as_ref(), b"first");
    let response = app.server.get(&format!("/api/files/{second}")).await;
    assert_eq!(response.as_bytes().as_ref(), b"second");
}

#[tokio::test]
async fn test_upload_without_info_is_rejected() {
    let app = TestApp::new().await;
    let form = MultipartForm::new().add_part("chunk", Part::bytes(b"orphan".to_vec()));

    let response = app.server.post("/api/files").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");
    assert_eq!(app.blob_count(), 0);

    let list: Value = app.server.get("/api/files").await.json();
    assert_eq!(list["total_count"], 0);
}

#[tokio::test]
async fn test_upload_with_malformed_info_is_rejected() {
    let app = TestApp::new().await;
    let form = MultipartForm::new()
        .add_part("info", Part::text("{not json"))
        .add_part("chunk", Part::bytes(b"data".to_vec()));

    let response = app.server.post("/api/files").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(app.blob_count(), 0);
}

#[tokio::test]
async fn test_upload_with_duplicate_info_is_rejected() {
    let app = TestApp::new().await;
    let form = upload_form("a.txt", "text/plain", &[b"one"])
        .add_part("info", Part::text(r#"{"filename":"b.txt"}"#));

    let response = app.server.post("/api/files").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(app.blob_count(), 0);
}

#[tokio::test]
async fn test_upload_without_multipart_body_is_rejected() {
    let app = TestApp::new().await;

    let response = app.server.post("/api/files").text("just text").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");
    assert!(!body["error"]["message"].as_str().unwrap().is_empty());
    assert_eq!(app.blob_count(), 0);
}

#[tokio::test]
async fn test_upload_ignores_unknown_parts() {
    let app = TestApp::new().await;
    let form = upload_form("notes.md", "text/markdown", &[b"# Title"])
        .add_part("comment", Part::text("ignored"))
        .add_part("chunk", Part::bytes(b"\nbody".to_vec()));

    let response = app.server.post("/api/files").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["size"], 12);
}

#[tokio::test]
async fn test_upload_info_without_chunks_stores_empty_file() {
    let app = TestApp::new().await;
    let form = upload_form("empty.txt", "text/plain", &[]);

    let response = app.server.post("/api/files").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["size"], 0);

    let filename = body["filename"].as_str().unwrap();
    let response = app.server.get(&format!("/api/files/{filename}")).await;
    response.assert_status_ok();
    assert!(response.as_bytes().is_empty());
}

#[tokio::test]
async fn test_upload_strips_directories_from_name() {
    let app = TestApp::new().await;

    let filename = upload(&app, "../../etc/passwd", b"root:x:0:0").await;

    assert!(filename.starts_with("passwd_"));
    assert!(!filename.contains('/'));
    assert_eq!(app.blob_count(), 1);
}

// ============================================================================
// Download
// ============================================================================

#[tokio::test]
async fn test_download_unknown_file() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/files/missing.txt").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_download_large_file_in_frames() {
    let app = TestApp::new().await;
    let content: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 253) as u8).collect();

    let response = app
        .server
        .post("/api/files")
        .multipart(chunked_form("blob.bin", &content, 50_000))
        .await;
    response.assert_status_ok();
    let filename = response.json::<Value>()["filename"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.server.get(&format!("/api/files/{filename}")).await;

    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), content.as_slice());
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        "application/octet-stream"
    );
    app.wait_idle(OperationClass::Download).await;
}

#[tokio::test]
async fn test_download_with_missing_blob_is_internal() {
    let app = TestApp::new().await;
    let filename = upload(&app, "vanish.txt", b"soon gone").await;
    std::fs::remove_file(app.storage_dir().join(&filename)).unwrap();

    let response = app.server.get(&format!("/api/files/{filename}")).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INTERNAL");
}

// ============================================================================
// List
// ============================================================================

#[tokio::test]
async fn test_list_empty() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/files").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total_count"], 0);
    assert!(body["files"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_newest_first_with_pages() {
    let app = TestApp::new().await;
    let mut names = Vec::new();
    for i in 0..5 {
        names.push(upload(&app, &format!("f{i}.txt"), b"x").await);
    }

    let body: Value = app
        .server
        .get("/api/files?page=1&page_size=2")
        .await
        .json();
    assert_eq!(body["total_count"], 5);
    let page: Vec<&str> = body["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["filename"].as_str().unwrap())
        .collect();
    assert_eq!(page, vec![names[4].as_str(), names[3].as_str()]);

    let body: Value = app
        .server
        .get("/api/files?page=3&page_size=2")
        .await
        .json();
    assert_eq!(body["files"].as_array().unwrap().len(), 1);
    assert_eq!(body["files"][0]["filename"], names[0].as_str());

    let body: Value = app
        .server
        .get("/api/files?page=10&page_size=2")
        .await
        .json();
    assert_eq!(body["total_count"], 5);
    assert!(body["files"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_out_of_range_params_use_defaults() {
    let app = TestApp::new().await;
    for i in 0..25 {
        upload(&app, &format!("n{i}.dat"), b"n").await;
    }

    for query in ["page=0&page_size=0", "page_size=200", ""] {
        let body: Value = app.server.get(&format!("/api/files?{query}")).await.json();
        assert_eq!(body["total_count"], 25, "query {query:?}");
        assert_eq!(body["files"].as_array().unwrap().len(), 20, "query {query:?}");
    }

    let body: Value = app.server.get("/api/files?page_size=100").await.json();
    assert_eq!(body["files"].as_array().unwrap().len(), 25);
}

#[tokio::test]
async fn test_list_with_non_numeric_params_is_rejected() {
    let app = TestApp::new().await;

    for query in ["page=abc", "page_size=-1"] {
        let response = app.server.get(&format!("/api/files?{query}")).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "INVALID_ARGUMENT", "query {query:?}");
    }
}

// ============================================================================
// Admission
// ============================================================================

#[tokio::test]
async fn test_upload_rejected_when_at_capacity() {
    let app = TestApp::with_capacities(1, 1, 1).await;
    let held = app.admission.try_admit(OperationClass::Upload).unwrap();

    let response = app
        .server
        .post("/api/files")
        .multipart(chunked_form("busy.txt", b"data", 4))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.header(header::RETRY_AFTER), "1");
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "RESOURCE_EXHAUSTED");
    assert_eq!(app.blob_count(), 0);

    drop(held);
    let response = app
        .server
        .post("/api/files")
        .multipart(chunked_form("busy.txt", b"data", 4))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_classes_limited_independently() {
    let app = TestApp::with_capacities(1, 1, 1).await;
    let filename = upload(&app, "a.txt", b"abc").await;
    let _held = app.admission.try_admit(OperationClass::Download).unwrap();

    let response = app.server.get(&format!("/api/files/{filename}")).await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);

    app.server.get("/api/files").await.assert_status_ok();
    upload(&app, "b.txt", b"def").await;
}

#[tokio::test]
async fn test_list_rejected_when_at_capacity() {
    let app = TestApp::with_capacities(1, 1, 1).await;
    let _held = app.admission.try_admit(OperationClass::List).unwrap();

    let response = app.server.get("/api/files").await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_slots_released_after_requests() {
    let app = TestApp::with_capacities(1, 1, 1).await;

    for i in 0..3 {
        let filename = upload(&app, &format!("r{i}.txt"), b"again").await;
        app.server
            .get(&format!("/api/files/{filename}"))
            .await
            .assert_status_ok();
        app.wait_idle(OperationClass::Download).await;
        app.server.get("/api/files").await.assert_status_ok();
    }

    // Failed requests release their slot too.
    app.server
        .get("/api/files/missing.bin")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.wait_idle(OperationClass::Download).await;
    app.wait_idle(OperationClass::Upload).await;
    app.wait_idle(OperationClass::List).await;
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("OK");
}
